use derive_builder::Builder;

use crate::{CascadeError, Result};

#[derive(Debug, Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct CascadeConfigParams {
    pub release_prefix: String,
    pub development_branch: String,
    #[builder(default)]
    pub auto_merge: bool,
}

impl CascadeConfigParamsBuilder {
    pub fn build(&self) -> Result<CascadeConfig> {
        let params = self._build().map_err(|e| {
            CascadeError::invalid_config(format!(
                "Failed to build cascade config: {}",
                e
            ))
        })?;
        CascadeConfig::new(params)
    }
}

/// Settings shared by every cascade operation.
#[derive(Debug, Clone)]
pub struct CascadeConfig {
    /// Prefix identifying release branches, e.g. `release/`.
    pub release_prefix: String,
    /// Branch that terminates every cascade.
    pub development_branch: String,
    /// Merge approved cascade pull requests whose builds all succeeded.
    pub auto_merge: bool,
}

impl CascadeConfig {
    pub fn builder() -> CascadeConfigParamsBuilder {
        CascadeConfigParamsBuilder::default()
    }

    pub fn new(params: CascadeConfigParams) -> Result<Self> {
        if params.release_prefix.trim().is_empty() {
            return Err(CascadeError::invalid_config(
                "release branch prefix must not be empty",
            ));
        }

        if params.development_branch.trim().is_empty() {
            return Err(CascadeError::invalid_config(
                "development branch name must not be empty",
            ));
        }

        if params.development_branch.starts_with(&params.release_prefix) {
            return Err(CascadeError::invalid_config(format!(
                "development branch '{}' must not start with the release prefix '{}'",
                params.development_branch, params.release_prefix
            )));
        }

        Ok(Self {
            release_prefix: params.release_prefix,
            development_branch: params.development_branch,
            auto_merge: params.auto_merge,
        })
    }
}
