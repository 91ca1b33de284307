//! Slack Block Kit encoding for cards.
//!
//! Every block this bridge authors carries a stable `block_id`, which Slack
//! preserves across `chat.update`. Decoding classifies blocks by that id and
//! keeps their raw JSON.

use serde_json::{json, Map, Value};

use crate::card_text::escape_mrkdwn;
use crate::{
    ActionControl, ActionRowBlock, BlockKind, Card, CardBlock, DescriptionBlock, StatsBlock,
    StatusNoteBlock, SummaryBlock,
};

pub const SUMMARY_BLOCK_ID: &str = "pr_summary";
pub const DESCRIPTION_BLOCK_ID: &str = "pr_description";
pub const STATS_BLOCK_ID: &str = "pr_stats";
pub const ACTIONS_BLOCK_ID: &str = "pr_actions";
pub const STATUS_BLOCK_ID: &str = "pr_status";
pub const DIVIDER_BLOCK_ID: &str = "pr_divider";

impl Card {
    pub fn to_block_kit(&self) -> Vec<Value> {
        self.blocks().iter().map(encode_block).collect()
    }

    pub fn from_block_kit(blocks: &[Value]) -> Card {
        Card::new(
            blocks
                .iter()
                .map(|raw| CardBlock::Persisted {
                    kind: classify_block(raw),
                    raw: raw.clone(),
                })
                .collect(),
        )
    }
}

pub fn classify_block(raw: &Value) -> BlockKind {
    let block_id = raw.get("block_id").and_then(Value::as_str);
    match block_id {
        Some(SUMMARY_BLOCK_ID) => return BlockKind::Summary,
        Some(DESCRIPTION_BLOCK_ID) => return BlockKind::Description,
        Some(STATS_BLOCK_ID) => return BlockKind::Stats,
        Some(ACTIONS_BLOCK_ID) => return BlockKind::ActionRow,
        Some(STATUS_BLOCK_ID) => return BlockKind::StatusNote,
        Some(DIVIDER_BLOCK_ID) => return BlockKind::Divider,
        _ => {}
    }
    // Cards posted before block ids existed still expose their controls and divider.
    match raw.get("type").and_then(Value::as_str) {
        Some("actions") => BlockKind::ActionRow,
        Some("divider") => BlockKind::Divider,
        _ => BlockKind::Unrecognized,
    }
}

fn encode_block(block: &CardBlock) -> Value {
    match block {
        CardBlock::Summary(summary) => encode_summary(summary),
        CardBlock::Description(description) => encode_description(description),
        CardBlock::Stats(stats) => encode_stats(stats),
        CardBlock::ActionRow(row) => encode_action_row(row),
        CardBlock::StatusNote(note) => encode_status_note(note),
        CardBlock::Divider => json!({ "type": "divider", "block_id": DIVIDER_BLOCK_ID }),
        CardBlock::Persisted { raw, .. } => raw.clone(),
    }
}

fn mrkdwn(text: String) -> Value {
    json!({ "type": "mrkdwn", "text": text })
}

fn encode_summary(summary: &SummaryBlock) -> Value {
    let mut block = json!({
        "type": "section",
        "block_id": SUMMARY_BLOCK_ID,
        "text": mrkdwn(format!(
            "*{} <{}|{}>*\n{}",
            summary.status_glyph,
            summary.url,
            escape_mrkdwn(&summary.title),
            escape_mrkdwn(&summary.subtitle)
        )),
    });
    if let Some(avatar) = &summary.avatar {
        block["accessory"] = json!({
            "type": "image",
            "image_url": avatar.image_url,
            "alt_text": avatar.alt_text,
        });
    }
    block
}

fn encode_description(description: &DescriptionBlock) -> Value {
    json!({
        "type": "section",
        "block_id": DESCRIPTION_BLOCK_ID,
        "text": mrkdwn(format!("*Description:*\n{}", escape_mrkdwn(&description.text))),
    })
}

fn encode_stats(stats: &StatsBlock) -> Value {
    let fields = stats
        .fields()
        .into_iter()
        .map(|(label, value)| mrkdwn(format!("*{label}:*\n{}", escape_mrkdwn(&value))))
        .collect::<Vec<_>>();
    json!({
        "type": "section",
        "block_id": STATS_BLOCK_ID,
        "fields": fields,
    })
}

fn encode_action_row(row: &ActionRowBlock) -> Value {
    json!({
        "type": "actions",
        "block_id": ACTIONS_BLOCK_ID,
        "elements": row.controls.iter().map(encode_control).collect::<Vec<_>>(),
    })
}

fn encode_control(control: &ActionControl) -> Value {
    let mut button = Map::new();
    button.insert("type".to_string(), json!("button"));
    button.insert(
        "text".to_string(),
        json!({ "type": "plain_text", "text": control.label, "emoji": true }),
    );
    button.insert("action_id".to_string(), json!(control.action.action_id()));
    button.insert("value".to_string(), json!(control.routing.to_value_text()));
    if let Some(style) = control.style {
        button.insert("style".to_string(), json!(style.as_str()));
    }
    if let Some(url) = &control.url {
        button.insert("url".to_string(), json!(url));
    }
    Value::Object(button)
}

fn encode_status_note(note: &StatusNoteBlock) -> Value {
    let mut text = format!("{} *{}*", note.decision.glyph(), escape_mrkdwn(&note.text));
    if let Some(quote) = &note.quote {
        text.push_str(&format!("\n_\"{}\"_", escape_mrkdwn(quote)));
    }
    json!({
        "type": "section",
        "block_id": STATUS_BLOCK_ID,
        "text": mrkdwn(text),
    })
}
