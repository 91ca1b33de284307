use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CardError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle state of a pull request.
pub enum ReviewState {
    Open,
    Closed,
    Merged,
    Other(String),
}

impl ReviewState {
    /// GitHub reports merged pull requests as `closed` with `merged=true`.
    pub fn parse(raw: &str, merged: bool) -> Self {
        match raw.trim() {
            "open" => Self::Open,
            "closed" if merged => Self::Merged,
            "closed" => Self::Closed,
            "merged" => Self::Merged,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Platform-computed readiness of a pull request to be merged.
pub enum MergeabilityState {
    Clean,
    Dirty,
    Unstable,
    Blocked,
    Unknown,
    NotYetComputed,
    Other(String),
}

impl MergeabilityState {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Self::NotYetComputed;
        };
        match raw {
            "clean" => Self::Clean,
            "dirty" => Self::Dirty,
            "unstable" => Self::Unstable,
            "blocked" => Self::Blocked,
            "unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStats {
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCounts {
    pub commits: u64,
    pub comments: u64,
    pub review_comments: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Minimal, validated view of a pull request used to render cards.
pub struct ReviewRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: ReviewState,
    pub draft: bool,
    pub author: ReviewAuthor,
    pub source_branch: String,
    pub target_branch: String,
    pub html_url: String,
    pub mergeability: MergeabilityState,
    pub changes: ChangeStats,
    pub activity: ActivityCounts,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ReviewRequest {
    /// Only open, non-draft pull requests can be approved or sent back.
    pub fn accepts_review_actions(&self) -> bool {
        self.state == ReviewState::Open && !self.draft
    }
}

/// Maps a raw GitHub pull-request payload into a [`ReviewRequest`].
///
/// `id`, `number`, `title`, `state` and `user.login` are required; every
/// other field falls back to an empty or zero value.
pub fn normalize_review_request(payload: &Value) -> Result<ReviewRequest, CardError> {
    if !payload.is_object() {
        return Err(CardError::MalformedPayload { field: "payload" });
    }

    let id = required_u64(payload, "id")?;
    let number = required_u64(payload, "number")?;
    let title = required_str(payload, "title")?.to_string();
    let raw_state = required_str(payload, "state")?;
    let login = payload
        .get("user")
        .and_then(|user| user.get("login"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(CardError::MalformedPayload {
            field: "user.login",
        })?
        .to_string();

    let merged = payload
        .get("merged")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let avatar_url = payload
        .get("user")
        .and_then(|user| user.get("avatar_url"))
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .map(ToOwned::to_owned);

    Ok(ReviewRequest {
        id,
        number,
        title,
        body: optional_str(payload, "body").map(ToOwned::to_owned),
        state: ReviewState::parse(raw_state, merged),
        draft: payload
            .get("draft")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        author: ReviewAuthor { login, avatar_url },
        source_branch: branch_ref(payload, "head"),
        target_branch: branch_ref(payload, "base"),
        html_url: optional_str(payload, "html_url")
            .unwrap_or_default()
            .to_string(),
        mergeability: MergeabilityState::parse(optional_str(payload, "mergeable_state")),
        changes: ChangeStats {
            additions: count(payload, "additions"),
            deletions: count(payload, "deletions"),
            changed_files: count(payload, "changed_files"),
        },
        activity: ActivityCounts {
            commits: count(payload, "commits"),
            comments: count(payload, "comments"),
            review_comments: count(payload, "review_comments"),
        },
        created_at: optional_str(payload, "created_at").map(ToOwned::to_owned),
        updated_at: optional_str(payload, "updated_at").map(ToOwned::to_owned),
    })
}

fn required_u64(payload: &Value, field: &'static str) -> Result<u64, CardError> {
    payload
        .get(field)
        .and_then(Value::as_u64)
        .ok_or(CardError::MalformedPayload { field })
}

fn required_str<'a>(payload: &'a Value, field: &'static str) -> Result<&'a str, CardError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or(CardError::MalformedPayload { field })
}

fn optional_str<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(Value::as_str)
}

fn count(payload: &Value, field: &str) -> u64 {
    payload.get(field).and_then(Value::as_u64).unwrap_or(0)
}

fn branch_ref(payload: &Value, side: &str) -> String {
    payload
        .get(side)
        .and_then(|branch| branch.get("ref"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
