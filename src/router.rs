//! Routes parsed events to the cascade operations.
use log::*;
use std::sync::Arc;

use crate::{
    Result,
    cascade::next_target,
    event::{CascadeEvent, MergeEvent},
    orchestrator::{
        CascadeRequest, EnsureOutcome, Orchestrator, ReconcileReport,
    },
};

/// What handling an event amounted to.
#[derive(Debug)]
pub enum RouteOutcome {
    /// Merge into a branch outside the release chain.
    Ignored,
    /// Merge into a release branch, forwarded to the next branch.
    Cascaded(EnsureOutcome),
    /// Readiness check over the repository's open cascade pull requests.
    Reconciled(ReconcileReport),
}

pub struct EventRouter {
    orchestrator: Arc<Orchestrator>,
}

impl EventRouter {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Handles one event, logging the outcome. Never fails: errors end
    /// processing of this event only.
    pub async fn handle(&self, event: CascadeEvent) {
        match self.route(&event).await {
            Ok(RouteOutcome::Ignored) => {}
            Ok(RouteOutcome::Cascaded(outcome)) => {
                debug!("cascade outcome: {outcome:?}");
            }
            Ok(RouteOutcome::Reconciled(report)) => {
                info!(
                    "reconciled {}: {} succeeded, {} failed",
                    report.repository,
                    report.succeeded(),
                    report.failed()
                );
            }
            Err(err) => match &event {
                CascadeEvent::Merged(merge) => error!(
                    "cascade failed for {} ({} -> {}): {err}",
                    merge.repository,
                    merge.source_branch,
                    merge.destination_branch
                ),
                CascadeEvent::Activity {
                    event_key,
                    repository,
                } => error!(
                    "reconciliation failed for {repository} ({event_key}): {err}"
                ),
            },
        }
    }

    pub async fn route(&self, event: &CascadeEvent) -> Result<RouteOutcome> {
        match event {
            CascadeEvent::Merged(merge) => self.on_merge(merge).await,
            CascadeEvent::Activity { repository, .. } => {
                info!("checking auto mergeable pull requests in {repository}");
                let report = self
                    .orchestrator
                    .reconcile_open_cascade_pull_requests(repository)
                    .await?;
                Ok(RouteOutcome::Reconciled(report))
            }
        }
    }

    async fn on_merge(&self, merge: &MergeEvent) -> Result<RouteOutcome> {
        let config = self.orchestrator.config();

        if !merge
            .destination_branch
            .starts_with(config.release_prefix.as_str())
        {
            debug!(
                "ignoring merge into non-release branch {} in {}",
                merge.destination_branch, merge.repository
            );
            return Ok(RouteOutcome::Ignored);
        }

        info!(
            "pull request merged in {}: {} -> {}",
            merge.repository, merge.source_branch, merge.destination_branch
        );

        let branches = self
            .orchestrator
            .list_release_branches(&merge.repository)
            .await?;

        debug!("release branches in {}: {branches:?}", merge.repository);

        let next = next_target(
            &merge.destination_branch,
            &branches,
            &config.development_branch,
            &config.release_prefix,
        )?;

        info!("next target for {}: {next}", merge.destination_branch);

        let outcome = self
            .orchestrator
            .ensure_cascade_pull_request(&CascadeRequest {
                repository: merge.repository.clone(),
                source_branch: merge.destination_branch.clone(),
                destination_branch: next,
                reviewer: merge.author.clone(),
            })
            .await?;

        Ok(RouteOutcome::Cascaded(outcome))
    }
}
