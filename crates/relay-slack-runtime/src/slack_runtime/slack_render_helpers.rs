use relay_card::{CardError, RoutingPayload};
use relay_github::GithubApiError;
use thiserror::Error;

#[derive(Debug, Error)]
/// Reasons a review action is refused or fails after it was accepted.
pub(super) enum ReviewActionError {
    #[error("no github credential is configured for slack user {user_id}")]
    MissingCredential { user_id: String },
    #[error("card message {message_ts} was not found in {channel_id}")]
    CardNotFound {
        channel_id: String,
        message_ts: String,
    },
    #[error("card already shows a review decision")]
    AlreadyDecided,
    #[error("{github_login} lacks write access to {slug}")]
    WriteAccessDenied { github_login: String, slug: String },
    #[error("request-changes submission has no comment")]
    MissingComment,
    #[error("interaction is missing its trigger id")]
    MissingTrigger,
    #[error(transparent)]
    Card(CardError),
    #[error(transparent)]
    Github(#[from] GithubApiError),
    #[error("{0:#}")]
    Slack(#[from] anyhow::Error),
}

impl From<CardError> for ReviewActionError {
    fn from(error: CardError) -> Self {
        match error {
            CardError::AlreadyDecided => Self::AlreadyDecided,
            other => Self::Card(other),
        }
    }
}

impl ReviewActionError {
    /// Text for the ephemeral notice shown to the acting user.
    pub(super) fn user_notice(&self) -> String {
        match self {
            Self::MissingCredential { .. } => {
                "❌ No GitHub account is linked to your Slack user, so the review was not submitted."
                    .to_string()
            }
            Self::CardNotFound { .. } => {
                "❌ The pull request card could not be found. It may have been deleted.".to_string()
            }
            Self::AlreadyDecided => {
                "⚠️ This pull request card already shows a review decision.".to_string()
            }
            Self::WriteAccessDenied { github_login, slug } => {
                format!("🚫 GitHub user `{github_login}` does not have write access to {slug}.")
            }
            Self::MissingComment => "❌ Please describe the changes you are requesting.".to_string(),
            Self::MissingTrigger => {
                "❌ Slack did not provide enough context to open the form. Try again.".to_string()
            }
            Self::Card(_) => "❌ The pull request card could not be updated.".to_string(),
            Self::Github(error) => format!("❌ {}", error.user_message()),
            Self::Slack(_) => {
                "❌ Slack could not complete the request. Check bridge logs for details."
                    .to_string()
            }
        }
    }

    /// Stable code used in structured logs.
    pub(super) fn reason_code(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } => "missing_credential",
            Self::CardNotFound { .. } => "card_not_found",
            Self::AlreadyDecided => "already_decided",
            Self::WriteAccessDenied { .. } => "write_access_denied",
            Self::MissingComment => "missing_comment",
            Self::MissingTrigger => "missing_trigger",
            Self::Card(_) => "card_error",
            Self::Github(_) => "github_error",
            Self::Slack(_) => "slack_error",
        }
    }
}

pub(super) fn render_link_failure_notice(link: &RoutingPayload, error: &GithubApiError) -> String {
    format!(
        "❌ Could not load {} from GitHub. {}",
        link.slug(),
        error.user_message()
    )
}

pub(super) fn render_link_card_failure_notice(link: &RoutingPayload) -> String {
    format!(
        "❌ GitHub returned an unreadable response for {}.",
        link.slug()
    )
}
