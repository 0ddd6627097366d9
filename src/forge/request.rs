use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository identity on the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    /// Workspace (or user) that owns the repository.
    pub owner: String,
    /// Repository slug.
    pub slug: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            slug: slug.into(),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// Pull request lifecycle states reported by the hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrState {
    Open,
    Merged,
    Declined,
    Superseded,
    #[serde(other)]
    Unknown,
}

impl PrState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrState::Open => "OPEN",
            PrState::Merged => "MERGED",
            PrState::Declined => "DECLINED",
            PrState::Superseded => "SUPERSEDED",
            PrState::Unknown => "UNKNOWN",
        }
    }
}

/// Pull request information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub id: u64,
    pub title: String,
    pub source_branch: String,
    pub destination_branch: String,
    pub state: PrState,
}

/// Query for pull requests; unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrFilter {
    pub source_branch: Option<String>,
    pub destination_branch: Option<String>,
    /// Substring the title must contain.
    pub title_contains: Option<String>,
    pub state: Option<PrState>,
}

impl PrFilter {
    pub fn source(mut self, branch: impl Into<String>) -> Self {
        self.source_branch = Some(branch.into());
        self
    }

    pub fn destination(mut self, branch: impl Into<String>) -> Self {
        self.destination_branch = Some(branch.into());
        self
    }

    pub fn title_contains(mut self, text: impl Into<String>) -> Self {
        self.title_contains = Some(text.into());
        self
    }

    pub fn state(mut self, state: PrState) -> Self {
        self.state = Some(state);
        self
    }

    /// Whether a pull request satisfies every set constraint.
    pub fn matches(&self, pr: &PullRequest) -> bool {
        self.source_branch
            .as_ref()
            .is_none_or(|b| *b == pr.source_branch)
            && self
                .destination_branch
                .as_ref()
                .is_none_or(|b| *b == pr.destination_branch)
            && self
                .title_contains
                .as_ref()
                .is_none_or(|t| pr.title.contains(t.as_str()))
            && self.state.is_none_or(|s| s == pr.state)
    }

    /// Renders the filter as a Bitbucket query language expression.
    pub fn to_query(&self) -> String {
        let mut clauses = vec![];

        if let Some(branch) = &self.destination_branch {
            clauses.push(format!(
                "destination.branch.name = {}",
                quote_value(branch)
            ));
        }

        if let Some(branch) = &self.source_branch {
            clauses.push(format!("source.branch.name = {}", quote_value(branch)));
        }

        if let Some(title) = &self.title_contains {
            clauses.push(format!("title ~ {}", quote_value(title)));
        }

        if let Some(state) = &self.state {
            clauses.push(format!("state = {}", quote_value(state.as_str())));
        }

        clauses.join(" AND ")
    }
}

/// Quotes a value for use inside a query expression.
pub fn quote_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Request to create a new pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    pub source_branch: String,
    pub destination_branch: String,
    pub title: String,
    pub description: String,
    /// Account identifiers of the requested reviewers.
    pub reviewers: Vec<String>,
    pub close_source_branch: bool,
}

/// Build status states reported against a pull request's head commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusState {
    Successful,
    Failed,
    Inprogress,
    Stopped,
    #[serde(other)]
    Unknown,
}

/// Build status attached to a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatus {
    pub key: String,
    pub state: StatusState,
}
