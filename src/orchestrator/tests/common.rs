//! Common test utilities for orchestrator tests.

use std::sync::Arc;

use crate::{
    forge::{
        request::{PrState, PullRequest, Repository},
        traits::MockForge,
    },
    orchestrator::{
        CASCADE_MARKER, Orchestrator, OrchestratorParams, config::CascadeConfig,
    },
};

pub const TEST_PREFIX: &str = "release/";
pub const TEST_DEVELOP: &str = "develop";

pub fn test_repo() -> Repository {
    Repository::new("acme", "widgets")
}

/// Creates a test Orchestrator with the provided mock forge.
/// This allows tests to set expectations on the mock before creating the
/// orchestrator.
///
/// # Example
/// ```ignore
/// let mut mock_forge = MockForge::new();
/// mock_forge.expect_find_pull_requests().returning(|_, _| Ok(vec![]));
/// let orchestrator = create_test_orchestrator(mock_forge);
/// ```
pub fn create_test_orchestrator(mock_forge: MockForge) -> Orchestrator {
    create_test_orchestrator_with_auto_merge(mock_forge, false)
}

pub fn create_test_orchestrator_with_auto_merge(
    mock_forge: MockForge,
    auto_merge: bool,
) -> Orchestrator {
    let config = CascadeConfig::builder()
        .release_prefix(TEST_PREFIX)
        .development_branch(TEST_DEVELOP)
        .auto_merge(auto_merge)
        .build()
        .unwrap();

    Orchestrator::new(OrchestratorParams {
        config: Arc::new(config),
        forge: Arc::new(mock_forge),
    })
}

/// Open pull request titled the way the orchestrator titles them.
pub fn cascade_pr(id: u64, source: &str, destination: &str) -> PullRequest {
    PullRequest {
        id,
        title: format!("{CASCADE_MARKER} {source} -> {destination}"),
        source_branch: source.to_string(),
        destination_branch: destination.to_string(),
        state: PrState::Open,
    }
}
