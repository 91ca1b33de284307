use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::CardError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Routing data round-tripped through Slack in control values and modal metadata.
pub struct RoutingPayload {
    pub owner: String,
    pub repo: String,
    #[serde(deserialize_with = "deserialize_pull_number")]
    pub pull_number: u64,
}

impl RoutingPayload {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, pull_number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            pull_number,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CardError> {
        let parsed = serde_json::from_str::<Self>(raw.trim())
            .map_err(|error| CardError::InvalidRouting(error.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn to_value_text(&self) -> String {
        json!({
            "owner": self.owner,
            "repo": self.repo,
            "pull_number": self.pull_number,
        })
        .to_string()
    }

    /// `owner/repo #number`, the subtitle shown on cards and modals.
    pub fn slug(&self) -> String {
        format!("{}/{} #{}", self.owner, self.repo, self.pull_number)
    }

    pub(crate) fn validate(&self) -> Result<(), CardError> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(CardError::InvalidRouting(
                "owner and repo must be non-empty".to_string(),
            ));
        }
        if self.pull_number == 0 {
            return Err(CardError::InvalidRouting(
                "pull_number must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PullNumberRepr {
    Number(u64),
    Text(String),
}

fn deserialize_pull_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match PullNumberRepr::deserialize(deserializer)? {
        PullNumberRepr::Number(value) => Ok(value),
        PullNumberRepr::Text(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|error| serde::de::Error::custom(format!("invalid pull_number: {error}"))),
    }
}
