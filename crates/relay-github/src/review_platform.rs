use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::GithubApiError;

#[derive(Clone, PartialEq, Eq, Deserialize)]
/// GitHub identity a chat user acts as when submitting reviews.
pub struct Credential {
    pub github_login: String,
    token: String,
}

impl Credential {
    pub fn new(github_login: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            github_login: github_login.into(),
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("github_login", &self.github_login)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Maps a chat user id to the GitHub credential used on their behalf.
pub trait CredentialResolver: Send + Sync {
    fn resolve_credential(&self, chat_user_id: &str) -> Option<Credential>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmittedReview {
    pub id: u64,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[async_trait]
/// Review operations the bridge performs against the code-hosting platform.
pub trait ReviewPlatform: Send + Sync {
    /// Returns the raw pull-request payload for normalization.
    async fn fetch_review_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Value, GithubApiError>;

    async fn submit_approval(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        credential: &Credential,
    ) -> Result<SubmittedReview, GithubApiError>;

    async fn submit_changes_requested(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comment: &str,
        credential: &Credential,
    ) -> Result<SubmittedReview, GithubApiError>;

    /// True when `username` holds admin or write permission on the repository.
    async fn check_write_access(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<bool, GithubApiError>;
}
