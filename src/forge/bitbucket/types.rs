use serde::{Deserialize, Serialize};

use crate::forge::request::{
    CommitStatus, CreatePrRequest, PrState, PullRequest, StatusState,
};

/// One page of a paginated listing.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub values: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BitbucketBranch {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BranchName {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BranchEndpoint {
    pub branch: BranchName,
}

impl BranchEndpoint {
    fn named(name: String) -> Self {
        Self {
            branch: BranchName { name },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BitbucketPullRequest {
    pub id: u64,
    pub title: String,
    pub state: PrState,
    pub source: BranchEndpoint,
    pub destination: BranchEndpoint,
}

impl From<BitbucketPullRequest> for PullRequest {
    fn from(pr: BitbucketPullRequest) -> Self {
        Self {
            id: pr.id,
            title: pr.title,
            source_branch: pr.source.branch.name,
            destination_branch: pr.destination.branch.name,
            state: pr.state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Reviewer {
    pub uuid: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePull {
    pub title: String,
    pub description: String,
    pub source: BranchEndpoint,
    pub destination: BranchEndpoint,
    pub reviewers: Vec<Reviewer>,
    pub close_source_branch: bool,
}

impl From<CreatePrRequest> for CreatePull {
    fn from(req: CreatePrRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            source: BranchEndpoint::named(req.source_branch),
            destination: BranchEndpoint::named(req.destination_branch),
            reviewers: req
                .reviewers
                .into_iter()
                .map(|uuid| Reviewer { uuid })
                .collect(),
            close_source_branch: req.close_source_branch,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MergePull {
    pub close_source_branch: bool,
}

#[derive(Debug, Deserialize)]
pub struct BitbucketStatus {
    pub key: String,
    pub state: StatusState,
}

impl From<BitbucketStatus> for CommitStatus {
    fn from(status: BitbucketStatus) -> Self {
        Self {
            key: status.key,
            state: status.state,
        }
    }
}
