//! Resolution of the next branch in a release cascade.
//!
//! The cascade chain is the ascending list of release branches present in a
//! repository followed by the development branch. A change merged into one
//! release branch is carried to the next element of the chain.
use std::collections::BTreeMap;

use crate::{
    CascadeError, Result,
    version::{ReleaseVersion, to_branch_name, to_version},
};

/// Ordered view of a repository's release branches plus the terminal
/// development branch.
#[derive(Debug, Clone)]
pub struct CascadeChain {
    prefix: String,
    releases: Vec<ReleaseVersion>,
    development_branch: String,
}

impl CascadeChain {
    /// Builds the chain from a live branch listing.
    ///
    /// Branches that do not carry `prefix` or whose remainder is not a
    /// version are dropped. Two different branch names with the same version
    /// precedence produce [`CascadeError::DuplicateVersion`].
    pub fn new<S: AsRef<str>>(
        branches: &[S],
        development_branch: &str,
        prefix: &str,
    ) -> Result<Self> {
        let mut by_version: BTreeMap<ReleaseVersion, String> = BTreeMap::new();

        for branch in branches {
            let branch: &str = branch.as_ref();
            let Some(version) = to_version(branch, prefix) else {
                log::debug!("ignoring non-release branch: {branch}");
                continue;
            };

            if let Some(existing) = by_version.get(&version) {
                if existing != branch {
                    return Err(CascadeError::duplicate_version(
                        version.semver().to_string(),
                        existing.clone(),
                        branch,
                    ));
                }
                continue;
            }

            by_version.insert(version, branch.to_string());
        }

        Ok(Self {
            prefix: prefix.to_string(),
            releases: by_version.into_keys().collect(),
            development_branch: development_branch.to_string(),
        })
    }

    /// Release branch names in ascending version order.
    pub fn release_branches(&self) -> Vec<String> {
        self.releases
            .iter()
            .map(|v| to_branch_name(v, &self.prefix))
            .collect()
    }

    /// Branch that follows `version` in the chain.
    pub fn next_after(&self, version: &ReleaseVersion) -> String {
        self.releases
            .iter()
            .find(|candidate| *candidate > version)
            .map(|next| to_branch_name(next, &self.prefix))
            .unwrap_or_else(|| self.development_branch.clone())
    }
}

/// Computes the branch a change merged into `destination` cascades to.
///
/// Returns the lowest known release branch strictly newer than
/// `destination`, or `development_branch` when `destination` is the newest.
pub fn next_target<S: AsRef<str>>(
    destination: &str,
    known_release_branches: &[S],
    development_branch: &str,
    release_prefix: &str,
) -> Result<String> {
    let current = to_version(destination, release_prefix).ok_or_else(|| {
        CascadeError::NotReleaseBranch {
            branch: destination.to_string(),
            prefix: release_prefix.to_string(),
        }
    })?;

    let mut branches: Vec<&str> =
        known_release_branches.iter().map(|b| b.as_ref()).collect();
    branches.push(destination);

    let chain =
        CascadeChain::new(&branches, development_branch, release_prefix)?;

    log::debug!(
        "cascade chain: {:?} -> {development_branch}",
        chain.release_branches()
    );

    Ok(chain.next_after(&current))
}
