//! CLI argument parsing and service configuration.
use clap::Parser;
use secrecy::SecretString;
use std::{net::SocketAddr, time::Duration};
use url::Url;

use crate::{
    CascadeError, Result,
    forge::config::{
        DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS, RemoteConfig,
    },
    orchestrator::config::CascadeConfig,
    worker::{DEFAULT_QUEUE_SIZE, DEFAULT_WORKERS},
};

/// Every flag falls back to an environment variable so the service can be
/// configured entirely from its deployment environment.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, env = "PORT")]
    /// Port to listen on.
    pub port: u16,

    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0")]
    /// Address to bind.
    pub bind_address: String,

    #[arg(long, env = "BITBUCKET_USERNAME")]
    /// Bitbucket account used for every API call.
    pub bitbucket_username: String,

    #[arg(long, env = "BITBUCKET_PASSWORD", hide_env_values = true)]
    /// App password for the Bitbucket account.
    pub bitbucket_password: String,

    #[arg(long, env = "BITBUCKET_SHARED_KEY", hide_env_values = true)]
    /// Value webhooks must carry in the `key` query parameter.
    pub bitbucket_shared_key: String,

    #[arg(long, env = "BITBUCKET_API_URL", default_value = DEFAULT_API_URL)]
    /// Bitbucket REST API root.
    pub bitbucket_api_url: String,

    #[arg(long, env = "RELEASE_BRANCH_PREFIX")]
    /// Prefix identifying release branches, e.g. "release/".
    pub release_branch_prefix: String,

    #[arg(long, env = "DEVELOPMENT_BRANCH_NAME")]
    /// Branch every cascade ends in, e.g. "develop".
    pub development_branch_name: String,

    #[arg(long, env = "CASCADE_AUTO_MERGE", default_value_t = false)]
    /// Merge approved cascade pull requests once every build succeeded.
    pub auto_merge: bool,

    #[arg(long, env = "CASCADE_WORKERS", default_value_t = DEFAULT_WORKERS)]
    /// Number of background workers handling events.
    pub workers: usize,

    #[arg(long, env = "CASCADE_QUEUE_SIZE", default_value_t = DEFAULT_QUEUE_SIZE)]
    /// Events that may wait for a worker before webhooks are refused.
    pub queue_size: usize,

    #[arg(
        long,
        env = "CASCADE_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS
    )]
    /// Timeout in seconds for each call to Bitbucket.
    pub request_timeout_secs: u64,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

impl Args {
    /// Socket address the server binds.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                CascadeError::invalid_config(format!(
                    "invalid listen address {}:{}: {e}",
                    self.bind_address, self.port
                ))
            })
    }

    /// Hosting service connection settings.
    pub fn remote_config(&self) -> Result<RemoteConfig> {
        require("bitbucket username", &self.bitbucket_username)?;
        require("bitbucket password", &self.bitbucket_password)?;

        let api_url = Url::parse(&self.bitbucket_api_url).map_err(|e| {
            CascadeError::invalid_config(format!(
                "invalid bitbucket api url '{}': {e}",
                self.bitbucket_api_url
            ))
        })?;

        Ok(RemoteConfig {
            api_url,
            username: self.bitbucket_username.clone(),
            password: SecretString::from(self.bitbucket_password.clone()),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }

    /// Cascade behaviour settings.
    pub fn cascade_config(&self) -> Result<CascadeConfig> {
        CascadeConfig::builder()
            .release_prefix(self.release_branch_prefix.as_str())
            .development_branch(self.development_branch_name.as_str())
            .auto_merge(self.auto_merge)
            .build()
    }

    /// Shared key webhooks must present.
    pub fn shared_key(&self) -> Result<SecretString> {
        require("bitbucket shared key", &self.bitbucket_shared_key)?;
        Ok(SecretString::from(self.bitbucket_shared_key.clone()))
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CascadeError::invalid_config(format!(
            "{name} must be set"
        )));
    }
    Ok(())
}
