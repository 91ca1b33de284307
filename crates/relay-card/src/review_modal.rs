use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{CardError, RoutingPayload};

pub const REQUEST_CHANGES_CALLBACK_ID: &str = "request_changes_modal";
pub const COMMENT_BLOCK_ID: &str = "comment_block";
pub const COMMENT_ACTION_ID: &str = "comment_input";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Data carried through the request-changes modal's `private_metadata`.
pub struct ModalContext {
    #[serde(flatten)]
    pub routing: RoutingPayload,
    pub channel_id: String,
    pub message_ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl ModalContext {
    pub fn from_private_metadata(raw: &str) -> Result<Self, CardError> {
        let context = serde_json::from_str::<Self>(raw.trim())
            .map_err(|error| CardError::InvalidRouting(error.to_string()))?;
        context.routing.validate()?;
        if context.channel_id.trim().is_empty() || context.message_ts.trim().is_empty() {
            return Err(CardError::InvalidRouting(
                "modal metadata is missing the card message identity".to_string(),
            ));
        }
        Ok(context)
    }

    pub fn to_private_metadata(&self) -> String {
        let mut metadata = json!({
            "owner": self.routing.owner,
            "repo": self.routing.repo,
            "pull_number": self.routing.pull_number,
            "channel_id": self.channel_id,
            "message_ts": self.message_ts,
        });
        if let Some(thread_ts) = &self.thread_ts {
            metadata["thread_ts"] = Value::String(thread_ts.clone());
        }
        metadata.to_string()
    }
}

/// Builds the `views.open` payload asking a reviewer for a change request.
pub fn request_changes_modal(context: &ModalContext) -> Value {
    json!({
        "type": "modal",
        "callback_id": REQUEST_CHANGES_CALLBACK_ID,
        "title": { "type": "plain_text", "text": "Request Changes" },
        "submit": { "type": "plain_text", "text": "Submit" },
        "close": { "type": "plain_text", "text": "Cancel" },
        "private_metadata": context.to_private_metadata(),
        "blocks": [
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*Requesting changes for:*\n{}", context.routing.slug()),
                },
            },
            {
                "type": "input",
                "block_id": COMMENT_BLOCK_ID,
                "element": {
                    "type": "plain_text_input",
                    "action_id": COMMENT_ACTION_ID,
                    "multiline": true,
                    "placeholder": {
                        "type": "plain_text",
                        "text": "Please describe what changes are needed...",
                    },
                },
                "label": { "type": "plain_text", "text": "Comment" },
            },
        ],
    })
}

/// Reads the submitted comment from a `view.state.values` object.
pub fn extract_modal_comment(state_values: &Value) -> Option<String> {
    state_values
        .get(COMMENT_BLOCK_ID)
        .and_then(|block| block.get(COMMENT_ACTION_ID))
        .and_then(|input| input.get("value"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|comment| !comment.is_empty())
        .map(ToOwned::to_owned)
}
