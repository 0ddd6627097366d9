//! Tests for ensure_cascade_pull_request.
//!
//! Tests for:
//! - Creating a pull request when none is open
//! - Skipping creation when one is open
//! - Idempotence across repeated calls
//! - Propagation of remote failures

use std::sync::{Arc, Mutex};

use super::common::*;
use crate::{
    CascadeError,
    forge::{
        request::{CreatePrRequest, PrState, PullRequest},
        traits::MockForge,
    },
    orchestrator::{CASCADE_MARKER, CascadeRequest, EnsureOutcome},
};

fn request(reviewer: Option<&str>) -> CascadeRequest {
    CascadeRequest {
        repository: test_repo(),
        source_branch: "release/2024.2.1".into(),
        destination_branch: "release/2024.9.0".into(),
        reviewer: reviewer.map(String::from),
    }
}

#[tokio::test]
async fn test_creates_pull_request_when_none_is_open() {
    let mut mock_forge = MockForge::new();

    mock_forge
        .expect_find_pull_requests()
        .withf(|repo, filter| {
            *repo == test_repo()
                && filter.source_branch.as_deref() == Some("release/2024.2.1")
                && filter.destination_branch.as_deref()
                    == Some("release/2024.9.0")
                && filter.title_contains.as_deref() == Some(CASCADE_MARKER)
                && filter.state == Some(PrState::Open)
        })
        .times(1)
        .returning(|_, _| Ok(vec![]));

    mock_forge
        .expect_create_pull_request()
        .withf(|_, req: &CreatePrRequest| {
            req.source_branch == "release/2024.2.1"
                && req.destination_branch == "release/2024.9.0"
                && req.title
                    == "#AutomaticCascade release/2024.2.1 -> release/2024.9.0"
                && req.description
                    == "#AutomaticCascade release/2024.2.1 -> release/2024.9.0, this branch will automatically be merged on successful build result+approval"
                && req.reviewers == vec!["{author-uuid}".to_string()]
                && !req.close_source_branch
        })
        .times(1)
        .returning(|_, req| {
            Ok(cascade_pr(10, &req.source_branch, &req.destination_branch))
        });

    let orchestrator = create_test_orchestrator(mock_forge);

    let outcome = orchestrator
        .ensure_cascade_pull_request(&request(Some("{author-uuid}")))
        .await
        .unwrap();

    assert!(matches!(outcome, EnsureOutcome::Created(ref pr) if pr.id == 10));
}

#[tokio::test]
async fn test_skips_creation_when_pull_request_is_open() {
    let mut mock_forge = MockForge::new();

    mock_forge.expect_find_pull_requests().returning(|_, _| {
        Ok(vec![cascade_pr(7, "release/2024.2.1", "release/2024.9.0")])
    });

    mock_forge.expect_create_pull_request().times(0);

    let orchestrator = create_test_orchestrator(mock_forge);

    let outcome = orchestrator
        .ensure_cascade_pull_request(&request(None))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        EnsureOutcome::AlreadyOpen(cascade_pr(
            7,
            "release/2024.2.1",
            "release/2024.9.0"
        ))
    );
    assert_eq!(outcome.pull_request().id, 7);
}

#[tokio::test]
async fn test_ignores_near_matches_returned_by_the_query() {
    let mut mock_forge = MockForge::new();

    // substring queries can return a neighbouring branch
    mock_forge.expect_find_pull_requests().returning(|_, _| {
        Ok(vec![cascade_pr(
            3,
            "release/2024.2.1-hotfix",
            "release/2024.9.0",
        )])
    });

    mock_forge
        .expect_create_pull_request()
        .times(1)
        .returning(|_, req| {
            Ok(cascade_pr(4, &req.source_branch, &req.destination_branch))
        });

    let orchestrator = create_test_orchestrator(mock_forge);

    let outcome = orchestrator
        .ensure_cascade_pull_request(&request(None))
        .await
        .unwrap();

    assert!(matches!(outcome, EnsureOutcome::Created(ref pr) if pr.id == 4));
}

#[tokio::test]
async fn test_no_reviewer_when_author_is_unknown() {
    let mut mock_forge = MockForge::new();

    mock_forge
        .expect_find_pull_requests()
        .returning(|_, _| Ok(vec![]));

    mock_forge
        .expect_create_pull_request()
        .withf(|_, req| req.reviewers.is_empty())
        .times(1)
        .returning(|_, req| {
            Ok(cascade_pr(5, &req.source_branch, &req.destination_branch))
        });

    let orchestrator = create_test_orchestrator(mock_forge);

    orchestrator
        .ensure_cascade_pull_request(&request(None))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_repeated_calls_create_exactly_one_pull_request() {
    let mut mock_forge = MockForge::new();
    let open: Arc<Mutex<Vec<PullRequest>>> = Arc::new(Mutex::new(vec![]));

    let listed = Arc::clone(&open);
    mock_forge
        .expect_find_pull_requests()
        .times(2)
        .returning(move |_, _| Ok(listed.lock().unwrap().clone()));

    let created = Arc::clone(&open);
    mock_forge
        .expect_create_pull_request()
        .times(1)
        .returning(move |_, req| {
            let pr = cascade_pr(11, &req.source_branch, &req.destination_branch);
            created.lock().unwrap().push(pr.clone());
            Ok(pr)
        });

    let orchestrator = create_test_orchestrator(mock_forge);
    let req = request(Some("{author-uuid}"));

    let first = orchestrator.ensure_cascade_pull_request(&req).await.unwrap();
    let second = orchestrator.ensure_cascade_pull_request(&req).await.unwrap();

    assert!(matches!(first, EnsureOutcome::Created(_)));
    assert!(matches!(second, EnsureOutcome::AlreadyOpen(ref pr) if pr.id == 11));
    assert_eq!(open.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_lookup_failure_aborts_without_creating() {
    let mut mock_forge = MockForge::new();

    mock_forge
        .expect_find_pull_requests()
        .returning(|_, _| Err(CascadeError::remote("HTTP 503")));

    mock_forge.expect_create_pull_request().times(0);

    let orchestrator = create_test_orchestrator(mock_forge);

    let err = orchestrator
        .ensure_cascade_pull_request(&request(None))
        .await
        .unwrap_err();

    assert!(matches!(err, CascadeError::RemoteCall(_)));
}

#[tokio::test]
async fn test_creation_failure_is_propagated() {
    let mut mock_forge = MockForge::new();

    mock_forge
        .expect_find_pull_requests()
        .returning(|_, _| Ok(vec![]));

    mock_forge
        .expect_create_pull_request()
        .returning(|_, _| Err(CascadeError::remote("HTTP 400")));

    let orchestrator = create_test_orchestrator(mock_forge);

    let result = orchestrator
        .ensure_cascade_pull_request(&request(None))
        .await;

    assert!(matches!(result, Err(CascadeError::RemoteCall(_))));
}

#[tokio::test]
async fn test_list_release_branches_drops_substring_matches() {
    let mut mock_forge = MockForge::new();

    mock_forge
        .expect_list_branches()
        .withf(|_, prefix| prefix == TEST_PREFIX)
        .returning(|_, _| {
            Ok(vec![
                "release/1.0.0".into(),
                "pre-release/1.0.0".into(),
                "release/1.1.0".into(),
            ])
        });

    let orchestrator = create_test_orchestrator(mock_forge);

    let branches = orchestrator
        .list_release_branches(&test_repo())
        .await
        .unwrap();

    assert_eq!(branches, vec!["release/1.0.0", "release/1.1.0"]);
}
