//! Custom error types for cascade-merge.

use thiserror::Error;

/// Main error type for cascade operations.
#[derive(Error, Debug)]
pub enum CascadeError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Hosting service errors
    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    // Resolution errors
    #[error(
        "Duplicate release version {version}: branches '{first}' and '{second}' normalize to the same version"
    )]
    DuplicateVersion {
        version: String,
        first: String,
        second: String,
    },

    #[error("Branch '{branch}' is not a release branch for prefix '{prefix}'")]
    NotReleaseBranch { branch: String, prefix: String },

    // Inbound event errors
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    // Generic wrapper for other errors
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

/// Result type alias using CascadeError
pub type Result<T> = std::result::Result<T, CascadeError>;

impl CascadeError {
    /// Create a remote call error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteCall(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a malformed event error
    pub fn malformed_event(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }

    /// Create a duplicate version error
    pub fn duplicate_version(
        version: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::DuplicateVersion {
            version: version.into(),
            first: first.into(),
            second: second.into(),
        }
    }
}

// Implement From for reqwest errors (network/API)
impl From<reqwest::Error> for CascadeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::RemoteCall(format!("network failure: {err}"))
        } else if err.is_decode() {
            Self::RemoteCall(format!("malformed response: {err}"))
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                401 | 403 => {
                    Self::RemoteCall(format!("authentication failed: {err}"))
                }
                429 => Self::RemoteCall("rate limit exceeded".into()),
                _ => Self::RemoteCall(err.to_string()),
            }
        } else {
            Self::RemoteCall(err.to_string())
        }
    }
}

// Implement From for reqwest header errors (needs custom message)
impl From<reqwest::header::InvalidHeaderValue> for CascadeError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::RemoteCall(format!("Invalid header value: {}", err))
    }
}

impl From<url::ParseError> for CascadeError {
    fn from(err: url::ParseError) -> Self {
        Self::RemoteCall(format!("invalid request url: {err}"))
    }
}

// JSON errors only come from decoding hosting service responses
impl From<serde_json::Error> for CascadeError {
    fn from(err: serde_json::Error) -> Self {
        Self::RemoteCall(format!("malformed response: {err}"))
    }
}

impl From<std::io::Error> for CascadeError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(color_eyre::Report::from(err))
    }
}

impl From<log::SetLoggerError> for CascadeError {
    fn from(err: log::SetLoggerError) -> Self {
        Self::Other(color_eyre::Report::from(err))
    }
}
