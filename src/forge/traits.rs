//! Traits related to the remote hosting service
use async_trait::async_trait;

use crate::{
    Result,
    forge::request::{
        CommitStatus, CreatePrRequest, PrFilter, PullRequest, Repository,
    },
};

/// Capabilities the cascade core needs from the hosting service.
///
/// Implementations must return complete result sets, following pagination
/// internally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Forge: Send + Sync {
    /// Lists branch names matching `name_prefix`.
    async fn list_branches(
        &self,
        repo: &Repository,
        name_prefix: &str,
    ) -> Result<Vec<String>>;

    async fn find_pull_requests(
        &self,
        repo: &Repository,
        filter: &PrFilter,
    ) -> Result<Vec<PullRequest>>;

    async fn create_pull_request(
        &self,
        repo: &Repository,
        req: CreatePrRequest,
    ) -> Result<PullRequest>;

    async fn approve_pull_request(&self, repo: &Repository, id: u64)
    -> Result<()>;

    async fn merge_pull_request(&self, repo: &Repository, id: u64) -> Result<()>;

    /// Build statuses reported for the pull request's head commit.
    async fn pull_request_statuses(
        &self,
        repo: &Repository,
        id: u64,
    ) -> Result<Vec<CommitStatus>>;
}
