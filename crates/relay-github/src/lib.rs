//! GitHub review-platform client for the Slack review bridge.
//!
//! Fetches pull requests, submits reviews on behalf of a resolved reviewer
//! credential, and checks collaborator permissions. Failures are classified
//! into [`GithubApiError`] so callers can tell reviewers what went wrong.

pub mod github_api_client;
pub mod github_api_error;
pub mod github_transport_helpers;
pub mod review_platform;

pub use github_api_client::GithubApiClient;
pub use github_api_error::GithubApiError;
pub use review_platform::{Credential, CredentialResolver, ReviewPlatform, SubmittedReview};
