use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::github_transport_helpers::classify_github_failure;
use crate::{Credential, GithubApiError, ReviewPlatform, SubmittedReview};

const REVIEW_EVENT_APPROVE: &str = "APPROVE";
const REVIEW_EVENT_REQUEST_CHANGES: &str = "REQUEST_CHANGES";

#[derive(Clone)]
/// REST client for the GitHub pull-request endpoints the bridge needs.
///
/// Reads use the service token installed as the default authorization header.
/// Reviews are written with the acting reviewer's own token so that GitHub
/// attributes them to that person.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
}

impl GithubApiClient {
    pub fn new(api_base: String, token: String, request_timeout_ms: u64) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("pr-relay"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn pull_url(&self, owner: &str, repo: &str, number: u64) -> String {
        format!("{}/repos/{owner}/{repo}/pulls/{number}", self.api_base)
    }

    async fn submit_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        event: &str,
        body: Option<&str>,
        credential: &Credential,
    ) -> Result<SubmittedReview, GithubApiError> {
        let mut payload = json!({ "event": event });
        if let Some(body) = body {
            payload["body"] = Value::String(body.to_string());
        }
        let request = self
            .http
            .post(format!("{}/reviews", self.pull_url(owner, repo, number)))
            .bearer_auth(credential.token().trim())
            .json(&payload);
        self.request_json("submit review", request).await
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GithubApiError> {
        let response = request
            .send()
            .await
            .map_err(|source| GithubApiError::Transport {
                operation: operation.to_string(),
                source,
            })?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|source| GithubApiError::Decode {
                    operation: operation.to_string(),
                    source,
                });
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(classify_github_failure(status.as_u16(), &headers, &body))
    }
}

#[async_trait]
impl ReviewPlatform for GithubApiClient {
    async fn fetch_review_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Value, GithubApiError> {
        let request = self.http.get(self.pull_url(owner, repo, number));
        self.request_json("fetch pull request", request).await
    }

    async fn submit_approval(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        credential: &Credential,
    ) -> Result<SubmittedReview, GithubApiError> {
        self.submit_review(owner, repo, number, REVIEW_EVENT_APPROVE, None, credential)
            .await
    }

    async fn submit_changes_requested(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &str,
        credential: &Credential,
    ) -> Result<SubmittedReview, GithubApiError> {
        self.submit_review(
            owner,
            repo,
            number,
            REVIEW_EVENT_REQUEST_CHANGES,
            Some(comment),
            credential,
        )
        .await
    }

    async fn check_write_access(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<bool, GithubApiError> {
        #[derive(Deserialize)]
        struct PermissionLevel {
            permission: String,
        }

        let request = self.http.get(format!(
            "{}/repos/{owner}/{repo}/collaborators/{username}/permission",
            self.api_base
        ));
        match self
            .request_json::<PermissionLevel>("check collaborator permission", request)
            .await
        {
            Ok(level) => Ok(matches!(level.permission.as_str(), "admin" | "write")),
            Err(GithubApiError::NotFound) => Ok(false),
            Err(error) => Err(error),
        }
    }
}
