use thiserror::Error;

#[derive(Debug, Error)]
/// Enumerates GitHub API failures surfaced to reviewers.
pub enum GithubApiError {
    #[error("github resource not found")]
    NotFound,
    #[error("github rate limit exceeded")]
    RateLimited { retry_after_seconds: Option<u64> },
    #[error("github rejected credentials (status {status})")]
    AuthError { status: u16 },
    #[error("github rejected the review: {message}")]
    Conflict { message: String },
    #[error("github api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("github api {operation} request failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode github {operation}: {source}")]
    Decode {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
}

impl GithubApiError {
    /// Short, human-readable explanation suitable for an ephemeral chat notice.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound => {
                "GitHub could not find that pull request (it may be private or deleted).".to_string()
            }
            Self::RateLimited {
                retry_after_seconds: Some(seconds),
            } => format!("GitHub rate limit reached. Try again in {seconds} seconds."),
            Self::RateLimited {
                retry_after_seconds: None,
            } => "GitHub rate limit reached. Try again shortly.".to_string(),
            Self::AuthError { .. } => {
                "GitHub rejected your credentials for this repository.".to_string()
            }
            Self::Conflict { message } => format!("GitHub rejected the review: {message}"),
            Self::Status { status, .. } => format!("GitHub returned an error (status {status})."),
            Self::Transport { .. } | Self::Decode { .. } => {
                "GitHub could not be reached. Try again shortly.".to_string()
            }
        }
    }
}

impl PartialEq for GithubApiError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound, Self::NotFound) => true,
            (
                Self::RateLimited {
                    retry_after_seconds: left,
                },
                Self::RateLimited {
                    retry_after_seconds: right,
                },
            ) => left == right,
            (Self::AuthError { status: left }, Self::AuthError { status: right }) => left == right,
            (Self::Conflict { message: left }, Self::Conflict { message: right }) => left == right,
            (
                Self::Status {
                    status: left_status,
                    body: left_body,
                },
                Self::Status {
                    status: right_status,
                    body: right_body,
                },
            ) => left_status == right_status && left_body == right_body,
            _ => false,
        }
    }
}
