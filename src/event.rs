//! Inbound webhook events.
//!
//! Bitbucket identifies the event type in the `X-Event-Key` header and sends
//! a JSON payload. Only the fields the cascade needs are decoded.
use serde::Deserialize;

use crate::{CascadeError, Result, forge::request::Repository};

/// Header carrying the Bitbucket event type.
pub const EVENT_KEY_HEADER: &str = "x-event-key";
/// Event key sent when a pull request is merged.
pub const PULL_REQUEST_FULFILLED: &str = "pullrequest:fulfilled";

/// Immutable record of a completed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEvent {
    pub repository: Repository,
    pub source_branch: String,
    pub destination_branch: String,
    /// Account UUID of the pull request author, when present.
    pub author: Option<String>,
}

/// An event the router knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeEvent {
    /// A pull request was merged.
    Merged(MergeEvent),
    /// Anything else that may have changed merge readiness, e.g. a build
    /// status update or an approval.
    Activity {
        event_key: String,
        repository: Repository,
    },
}

impl CascadeEvent {
    /// Parses a webhook delivery.
    ///
    /// Fails with [`CascadeError::MalformedEvent`] when the event key is
    /// missing or the payload lacks the fields the event type requires.
    pub fn parse(event_key: Option<&str>, body: &[u8]) -> Result<Self> {
        let event_key = event_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CascadeError::malformed_event("missing X-Event-Key header")
            })?;

        let payload: WebhookPayload = serde_json::from_slice(body)
            .map_err(|e| CascadeError::malformed_event(e.to_string()))?;

        let repository = payload.repository.identity()?;

        if event_key != PULL_REQUEST_FULFILLED {
            return Ok(CascadeEvent::Activity {
                event_key: event_key.to_string(),
                repository,
            });
        }

        let pr = payload.pullrequest.ok_or_else(|| {
            CascadeError::malformed_event(
                "merge event without a pullrequest object",
            )
        })?;

        Ok(CascadeEvent::Merged(MergeEvent {
            repository,
            source_branch: pr.source.branch.name,
            destination_branch: pr.destination.branch.name,
            author: pr.author.and_then(|a| a.uuid).filter(|u| !u.is_empty()),
        }))
    }

    pub fn repository(&self) -> &Repository {
        match self {
            CascadeEvent::Merged(event) => &event.repository,
            CascadeEvent::Activity { repository, .. } => repository,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    repository: RepositoryPayload,
    #[serde(default)]
    pullrequest: Option<PullRequestPayload>,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    owner: Option<AccountPayload>,
}

impl RepositoryPayload {
    /// `full_name` is `<workspace>/<slug>`; older payloads only carried the
    /// owner's username and the repository name.
    fn identity(&self) -> Result<Repository> {
        if let Some((owner, slug)) = self
            .full_name
            .as_deref()
            .and_then(|n| n.split_once('/'))
            .filter(|(o, s)| !o.is_empty() && !s.is_empty())
        {
            return Ok(Repository::new(owner, slug));
        }

        let owner = self.owner.as_ref().and_then(|o| o.username.as_deref());

        match (owner, self.name.as_deref()) {
            (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Repository::new(owner, name))
            }
            _ => Err(CascadeError::malformed_event(
                "payload does not identify a repository",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountPayload {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BranchPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct EndpointPayload {
    branch: BranchPayload,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    source: EndpointPayload,
    destination: EndpointPayload,
    #[serde(default)]
    author: Option<AccountPayload>,
}
