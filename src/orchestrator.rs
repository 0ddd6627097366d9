//! Idempotent management of cascade pull requests.
//!
//! A cascade pull request carries [`CASCADE_MARKER`] in its title. The
//! orchestrator opens at most one per (repository, source, destination) and
//! pushes open ones forward by approving them and, when enabled, merging
//! them once every reported build succeeded. It never closes or reopens a
//! pull request.
use derive_builder::Builder;
use log::*;
use std::sync::Arc;

use crate::{
    CascadeError, Result,
    forge::{
        request::{
            CreatePrRequest, PrFilter, PrState, PullRequest, Repository,
            StatusState,
        },
        traits::Forge,
    },
    orchestrator::config::CascadeConfig,
};

pub mod config;

/// Title tag identifying pull requests opened by this service.
pub const CASCADE_MARKER: &str = "#AutomaticCascade";

#[derive(Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct OrchestratorParams {
    pub config: Arc<CascadeConfig>,
    pub forge: Arc<dyn Forge>,
}

impl OrchestratorParamsBuilder {
    pub fn build(&self) -> Result<Orchestrator> {
        let params = self._build().map_err(|e| {
            CascadeError::invalid_config(format!(
                "Failed to build orchestrator: {}",
                e
            ))
        })?;
        Ok(Orchestrator::new(params))
    }
}

/// Forward pull request the orchestrator must make sure exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeRequest {
    pub repository: Repository,
    pub source_branch: String,
    pub destination_branch: String,
    /// Account to request a review from, usually the author of the merge
    /// that triggered the cascade.
    pub reviewer: Option<String>,
}

impl CascadeRequest {
    pub fn title(&self) -> String {
        format!(
            "{CASCADE_MARKER} {} -> {}",
            self.source_branch, self.destination_branch
        )
    }

    pub fn description(&self) -> String {
        format!(
            "{}, this branch will automatically be merged on successful build result+approval",
            self.title()
        )
    }
}

/// Result of [`Orchestrator::ensure_cascade_pull_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created(PullRequest),
    AlreadyOpen(PullRequest),
}

impl EnsureOutcome {
    pub fn pull_request(&self) -> &PullRequest {
        match self {
            EnsureOutcome::Created(pr) | EnsureOutcome::AlreadyOpen(pr) => pr,
        }
    }
}

/// What reconciliation did with a single pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Approved; merging is left to the hosting service or a later pass.
    Approved,
    /// Approved and merged.
    Merged,
    /// Approved, but builds have not all succeeded yet.
    AwaitingChecks,
}

/// Per pull request outcome of a reconciliation pass.
#[derive(Debug)]
pub struct PullRequestReport {
    pub id: u64,
    pub title: String,
    pub result: Result<ReconcileAction>,
}

/// Outcome of a reconciliation pass over one repository.
#[derive(Debug)]
pub struct ReconcileReport {
    pub repository: Repository,
    pub pull_requests: Vec<PullRequestReport>,
}

impl ReconcileReport {
    pub fn succeeded(&self) -> usize {
        self.pull_requests
            .iter()
            .filter(|r| r.result.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.pull_requests.len() - self.succeeded()
    }
}

pub struct Orchestrator {
    config: Arc<CascadeConfig>,
    forge: Arc<dyn Forge>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorParamsBuilder {
        OrchestratorParamsBuilder::default()
    }

    pub fn new(params: OrchestratorParams) -> Self {
        Self {
            config: Arc::clone(&params.config),
            forge: Arc::clone(&params.forge),
        }
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Lists the repository's release branches straight from the hosting
    /// service.
    pub async fn list_release_branches(
        &self,
        repo: &Repository,
    ) -> Result<Vec<String>> {
        let prefix = &self.config.release_prefix;
        let branches = self.forge.list_branches(repo, prefix).await?;
        Ok(branches
            .into_iter()
            .filter(|b| b.starts_with(prefix.as_str()))
            .collect())
    }

    /// Opens the cascade pull request described by `req` unless an open one
    /// already exists.
    ///
    /// The existence check and the creation are not atomic: two concurrent
    /// callers may both create one. A redundant pull request is harmless.
    pub async fn ensure_cascade_pull_request(
        &self,
        req: &CascadeRequest,
    ) -> Result<EnsureOutcome> {
        let filter = PrFilter::default()
            .source(&req.source_branch)
            .destination(&req.destination_branch)
            .title_contains(CASCADE_MARKER)
            .state(PrState::Open);

        let existing = self
            .forge
            .find_pull_requests(&req.repository, &filter)
            .await?
            .into_iter()
            .find(|pr| filter.matches(pr));

        if let Some(pr) = existing {
            info!(
                "skipping creation, pull request #{} exists: {} -> {}",
                pr.id, req.source_branch, req.destination_branch
            );
            return Ok(EnsureOutcome::AlreadyOpen(pr));
        }

        let created = self
            .forge
            .create_pull_request(
                &req.repository,
                CreatePrRequest {
                    source_branch: req.source_branch.clone(),
                    destination_branch: req.destination_branch.clone(),
                    title: req.title(),
                    description: req.description(),
                    reviewers: req.reviewer.iter().cloned().collect(),
                    close_source_branch: false,
                },
            )
            .await?;

        info!(
            "created cascade pull request #{} in {}: {} -> {}",
            created.id,
            req.repository,
            req.source_branch,
            req.destination_branch
        );

        Ok(EnsureOutcome::Created(created))
    }

    /// Approves (and, with auto merge enabled, merges) every open cascade
    /// pull request in `repo`.
    ///
    /// Only the listing can fail the pass as a whole. Each pull request is
    /// handled independently and its outcome recorded in the report.
    pub async fn reconcile_open_cascade_pull_requests(
        &self,
        repo: &Repository,
    ) -> Result<ReconcileReport> {
        let filter = PrFilter::default()
            .title_contains(CASCADE_MARKER)
            .state(PrState::Open);

        let open = self.forge.find_pull_requests(repo, &filter).await?;

        let mut report = ReconcileReport {
            repository: repo.clone(),
            pull_requests: vec![],
        };

        for pr in open.into_iter().filter(|pr| filter.matches(pr)) {
            info!("trying to auto merge #{} in {repo}: {}", pr.id, pr.title);

            let result = self.advance(repo, &pr).await;

            match &result {
                Ok(action) => info!("#{} in {repo}: {action:?}", pr.id),
                Err(err) => warn!("#{} in {repo} failed: {err}", pr.id),
            }

            report.pull_requests.push(PullRequestReport {
                id: pr.id,
                title: pr.title,
                result,
            });
        }

        Ok(report)
    }

    async fn advance(
        &self,
        repo: &Repository,
        pr: &PullRequest,
    ) -> Result<ReconcileAction> {
        // a refused approval does not block merging a green pull request
        let approved = self.forge.approve_pull_request(repo, pr.id).await;

        if !self.config.auto_merge {
            return approved.map(|_| ReconcileAction::Approved);
        }

        if let Err(err) = &approved {
            warn!("approving #{} in {repo} failed: {err}", pr.id);
        }

        if !self.checks_passed(repo, pr.id).await? {
            debug!("#{} in {repo} is waiting on build results", pr.id);
            return approved.map(|_| ReconcileAction::AwaitingChecks);
        }

        self.forge.merge_pull_request(repo, pr.id).await?;

        Ok(ReconcileAction::Merged)
    }

    /// True when at least one build reported and every build succeeded.
    async fn checks_passed(&self, repo: &Repository, id: u64) -> Result<bool> {
        let statuses = self.forge.pull_request_statuses(repo, id).await?;
        Ok(!statuses.is_empty()
            && statuses.iter().all(|s| s.state == StatusState::Successful))
    }
}
