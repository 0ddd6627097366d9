//! Implements the Forge trait for Bitbucket Cloud
use async_trait::async_trait;
use log::*;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;

use crate::{
    CascadeError, Result,
    forge::{
        bitbucket::types::{
            BitbucketBranch, BitbucketPullRequest, BitbucketStatus,
            CreatePull, MergePull, Page,
        },
        config::{DEFAULT_PAGE_SIZE, RemoteConfig},
        request::{
            CommitStatus, CreatePrRequest, PrFilter, PullRequest, Repository,
            quote_value,
        },
        traits::Forge,
    },
};

mod types;

/// Bitbucket Cloud forge implementation using reqwest and basic auth with
/// an app password.
pub struct Bitbucket {
    config: RemoteConfig,
    base_url: Url,
    client: Client,
}

impl Bitbucket {
    /// Create Bitbucket client from explicit credentials and API root.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    fn repo_url(&self, repo: &Repository, path: &str) -> Result<Url> {
        let url = self.base_url.join(&format!(
            "repositories/{}/{}/{path}",
            repo.owner, repo.slug
        ))?;
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(
            &self.config.username,
            Some(self.config.password.expose_secret()),
        )
    }

    /// Sends the request and turns any non-success status into a
    /// `RemoteCall` error carrying the response body.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        self.send_tolerating(builder, &[]).await
    }

    /// Like [`Self::send`], but statuses in `tolerated` are handed back to
    /// the caller instead of failing.
    async fn send_tolerating(
        &self,
        builder: RequestBuilder,
        tolerated: &[StatusCode],
    ) -> Result<Response> {
        let request = self.authorized(builder).build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.client.execute(request).await?;
        let status = response.status();

        if status.is_success() || tolerated.contains(&status) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        Err(CascadeError::remote(format!(
            "{method} {url} returned {status}: {body}"
        )))
    }

    /// Follows `next` links until the listing is exhausted.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Vec<T>> {
        let mut items = vec![];
        let mut next = Some(url);

        while let Some(url) = next {
            debug!("fetching page: {url}");
            let response = self.send(self.client.get(url)).await?;
            let page: Page<T> = response.json().await?;
            items.extend(page.values);
            next = page.next.map(|n| Url::parse(&n)).transpose()?;
        }

        Ok(items)
    }
}

#[async_trait]
impl Forge for Bitbucket {
    async fn list_branches(
        &self,
        repo: &Repository,
        name_prefix: &str,
    ) -> Result<Vec<String>> {
        let mut url = self.repo_url(repo, "refs/branches")?;

        url.query_pairs_mut()
            .append_pair("q", &format!("name ~ {}", quote_value(name_prefix)))
            .append_pair("pagelen", &DEFAULT_PAGE_SIZE.to_string());

        let branches: Vec<BitbucketBranch> = self.get_paginated(url).await?;

        // "~" is a substring match, narrow it down to real prefixes
        Ok(branches
            .into_iter()
            .map(|b| b.name)
            .filter(|name| name.starts_with(name_prefix))
            .collect())
    }

    async fn find_pull_requests(
        &self,
        repo: &Repository,
        filter: &PrFilter,
    ) -> Result<Vec<PullRequest>> {
        let mut url = self.repo_url(repo, "pullrequests")?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("pagelen", &DEFAULT_PAGE_SIZE.to_string());

            let query = filter.to_query();
            if !query.is_empty() {
                pairs.append_pair("q", &query);
            }

            // listing defaults to OPEN only unless a state is requested
            if let Some(state) = filter.state {
                pairs.append_pair("state", state.as_str());
            }
        }

        let pulls: Vec<BitbucketPullRequest> = self.get_paginated(url).await?;

        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    async fn create_pull_request(
        &self,
        repo: &Repository,
        req: CreatePrRequest,
    ) -> Result<PullRequest> {
        let url = self.repo_url(repo, "pullrequests")?;
        let body = CreatePull::from(req);
        let response = self.send(self.client.post(url).json(&body)).await?;
        let created: BitbucketPullRequest = response.json().await?;
        Ok(created.into())
    }

    async fn approve_pull_request(
        &self,
        repo: &Repository,
        id: u64,
    ) -> Result<()> {
        let url = self.repo_url(repo, &format!("pullrequests/{id}/approve"))?;
        // 409 means this account already approved
        let response = self
            .send_tolerating(self.client.post(url), &[StatusCode::CONFLICT])
            .await?;
        let status = response.status();
        debug!(
            "approve response for {repo} #{id} ({status}): {}",
            response.text().await.unwrap_or_default()
        );
        Ok(())
    }

    async fn merge_pull_request(&self, repo: &Repository, id: u64) -> Result<()> {
        let url = self.repo_url(repo, &format!("pullrequests/{id}/merge"))?;
        self.send(self.client.post(url).json(&MergePull {
            close_source_branch: false,
        }))
        .await?;
        Ok(())
    }

    async fn pull_request_statuses(
        &self,
        repo: &Repository,
        id: u64,
    ) -> Result<Vec<CommitStatus>> {
        let mut url =
            self.repo_url(repo, &format!("pullrequests/{id}/statuses"))?;
        url.query_pairs_mut()
            .append_pair("pagelen", &DEFAULT_PAGE_SIZE.to_string());
        let statuses: Vec<BitbucketStatus> = self.get_paginated(url).await?;
        Ok(statuses.into_iter().map(CommitStatus::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Query, State},
        response::IntoResponse,
        routing::{get, post},
    };
    use secrecy::SecretString;
    use serde_json::json;
    use std::{collections::HashMap, time::Duration};
    use tokio::net::TcpListener;

    fn client(api_url: &str) -> Bitbucket {
        Bitbucket::new(RemoteConfig {
            api_url: Url::parse(api_url).unwrap(),
            username: "bot".into(),
            password: SecretString::from("secret".to_string()),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_repo_url_joins_under_api_root() {
        let bitbucket = client("https://api.bitbucket.org/2.0/");
        let url = bitbucket
            .repo_url(&Repository::new("acme", "widgets"), "pullrequests/7/approve")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.bitbucket.org/2.0/repositories/acme/widgets/pullrequests/7/approve"
        );
    }

    #[test]
    fn test_api_root_without_trailing_slash_is_normalized() {
        let bitbucket = client("https://bitbucket.example.com/api/2.0");
        let url = bitbucket
            .repo_url(&Repository::new("acme", "widgets"), "refs/branches")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://bitbucket.example.com/api/2.0/repositories/acme/widgets/refs/branches"
        );
    }

    async fn branches(
        State(base): State<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        if query.get("page").map(String::as_str) == Some("2") {
            return Json(json!({"values": [{"name": "release/1.1.0"}]}));
        }

        Json(json!({
            "values": [
                {"name": "release/1.0.0"},
                {"name": "prerelease/9.0.0"}
            ],
            "next": format!(
                "{base}repositories/acme/widgets/refs/branches?page=2"
            ),
        }))
    }

    async fn server_error() -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, "database on fire")
    }

    async fn not_json() -> impl IntoResponse {
        (StatusCode::OK, "<html>maintenance</html>")
    }

    async fn already_approved() -> impl IntoResponse {
        (
            StatusCode::CONFLICT,
            Json(json!({"error": {
                "message": "You already approved this pull request."
            }})),
        )
    }

    async fn unauthorized() -> impl IntoResponse {
        (StatusCode::UNAUTHORIZED, "bad credentials")
    }

    /// Serves a canned Bitbucket API on an ephemeral port and returns a
    /// client pointed at it.
    async fn fake_bitbucket() -> Bitbucket {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/", listener.local_addr().unwrap());

        let app = Router::new()
            .route("/repositories/acme/widgets/refs/branches", get(branches))
            .route("/repositories/acme/broken/refs/branches", get(server_error))
            .route("/repositories/acme/garbled/refs/branches", get(not_json))
            .route(
                "/repositories/acme/widgets/pullrequests/7/approve",
                post(already_approved),
            )
            .route(
                "/repositories/acme/widgets/pullrequests/8/approve",
                post(unauthorized),
            )
            .with_state(base.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        client(&base)
    }

    #[tokio::test]
    async fn test_list_branches_follows_next_links() {
        let bitbucket = fake_bitbucket().await;

        let branches = bitbucket
            .list_branches(&Repository::new("acme", "widgets"), "release/")
            .await
            .unwrap();

        assert_eq!(
            branches,
            vec!["release/1.0.0".to_string(), "release/1.1.0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_error_status_becomes_remote_call_with_body() {
        let bitbucket = fake_bitbucket().await;

        let err = bitbucket
            .list_branches(&Repository::new("acme", "broken"), "release/")
            .await
            .unwrap_err();

        let CascadeError::RemoteCall(msg) = err else {
            panic!("expected remote call error");
        };
        assert!(msg.contains("500"), "{msg}");
        assert!(msg.contains("database on fire"), "{msg}");
    }

    #[tokio::test]
    async fn test_undecodable_response_becomes_remote_call() {
        let bitbucket = fake_bitbucket().await;

        let err = bitbucket
            .list_branches(&Repository::new("acme", "garbled"), "release/")
            .await
            .unwrap_err();

        assert!(matches!(err, CascadeError::RemoteCall(_)));
    }

    #[tokio::test]
    async fn test_repeat_approval_is_not_an_error() {
        let bitbucket = fake_bitbucket().await;
        let repo = Repository::new("acme", "widgets");

        bitbucket.approve_pull_request(&repo, 7).await.unwrap();

        let err = bitbucket.approve_pull_request(&repo, 8).await.unwrap_err();
        assert!(matches!(err, CascadeError::RemoteCall(_)));
    }
}
