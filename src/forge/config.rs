//! Configuration for hosting service connections.
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Default Bitbucket Cloud API root.
pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0/";
/// Default page size for paginated queries (Bitbucket's maximum).
pub const DEFAULT_PAGE_SIZE: u8 = 100;
/// Default timeout applied to every outbound request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Remote connection configuration for authenticating and interacting with
/// the hosting service.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// API root, e.g. `https://api.bitbucket.org/2.0/`.
    pub api_url: Url,
    /// Account used for every API call.
    pub username: String,
    /// App password for `username`.
    pub password: SecretString,
    /// Timeout applied to every outbound request.
    pub request_timeout: Duration,
}
