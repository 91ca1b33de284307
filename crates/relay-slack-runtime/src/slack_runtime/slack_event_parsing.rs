//! Socket Mode envelope parsing and normalization into bridge events.

use anyhow::{bail, Context, Result};
use regex::Regex;
use relay_card::{
    extract_modal_comment, CardAction, ModalContext, RoutingPayload, REQUEST_CHANGES_CALLBACK_ID,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::slack_helpers::slack_ts_to_unix_ms;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(super) struct SlackSocketEnvelope {
    /// Empty for control frames such as `hello` and `disconnect`.
    #[serde(default)]
    pub(super) envelope_id: String,
    #[serde(rename = "type")]
    pub(super) envelope_type: String,
    #[serde(default)]
    pub(super) payload: Value,
}

/// Finds pull-request links for one GitHub web host in message text.
#[derive(Debug, Clone)]
pub(super) struct PullRequestLinkMatcher {
    pattern: Regex,
}

impl PullRequestLinkMatcher {
    pub(super) fn new(web_host: &str) -> Result<Self> {
        let host = web_host.trim().trim_end_matches('/');
        if host.is_empty() {
            bail!("github web host must not be empty");
        }
        let pattern = Regex::new(&format!(
            r"https?://(?:www\.)?{}/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)/pull/(\d+)\b",
            regex::escape(host)
        ))
        .context("failed to compile pull request link pattern")?;
        Ok(Self { pattern })
    }

    /// Distinct links in order of first appearance.
    pub(super) fn find_links(&self, text: &str) -> Vec<RoutingPayload> {
        let mut links: Vec<RoutingPayload> = Vec::new();
        for captures in self.pattern.captures_iter(text) {
            let Ok(pull_number) = captures[3].parse::<u64>() else {
                continue;
            };
            if pull_number == 0 {
                continue;
            }
            let link = RoutingPayload::new(&captures[1], &captures[2], pull_number);
            if !links.contains(&link) {
                links.push(link);
            }
        }
        links
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct LinkMentioned {
    pub(super) key: String,
    pub(super) occurred_unix_ms: u64,
    pub(super) channel_id: String,
    pub(super) message_ts: String,
    pub(super) thread_ts: Option<String>,
    pub(super) user_id: String,
    pub(super) links: Vec<RoutingPayload>,
}

impl LinkMentioned {
    /// Cards are threaded under the linking message, or its thread when it has one.
    pub(super) fn reply_thread_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.message_ts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ActionInvoked {
    pub(super) key: String,
    pub(super) occurred_unix_ms: Option<u64>,
    pub(super) action: CardAction,
    pub(super) routing: RoutingPayload,
    pub(super) channel_id: String,
    pub(super) message_ts: String,
    pub(super) thread_ts: Option<String>,
    pub(super) user_id: String,
    pub(super) trigger_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ModalSubmitted {
    pub(super) key: String,
    pub(super) context: ModalContext,
    pub(super) comment: Option<String>,
    pub(super) user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SlackBridgeEvent {
    LinkMentioned(LinkMentioned),
    ActionInvoked(ActionInvoked),
    ModalSubmitted(ModalSubmitted),
}

impl SlackBridgeEvent {
    pub(super) fn key(&self) -> &str {
        match self {
            Self::LinkMentioned(event) => &event.key,
            Self::ActionInvoked(event) => &event.key,
            Self::ModalSubmitted(event) => &event.key,
        }
    }

    pub(super) fn occurred_unix_ms(&self) -> Option<u64> {
        match self {
            Self::LinkMentioned(event) => Some(event.occurred_unix_ms),
            Self::ActionInvoked(event) => event.occurred_unix_ms,
            Self::ModalSubmitted(_) => None,
        }
    }

    /// Events sharing a queue key run one at a time. Everything that
    /// rewrites a card is keyed by the card message; opening the modal only
    /// needs its own key so the trigger id is used before it expires.
    pub(super) fn queue_key(&self) -> String {
        match self {
            Self::LinkMentioned(event) => {
                format!("message:{}:{}", event.channel_id, event.message_ts)
            }
            Self::ActionInvoked(event) if event.action == CardAction::Approve => {
                format!("card:{}:{}", event.channel_id, event.message_ts)
            }
            Self::ActionInvoked(event) => event.key.clone(),
            Self::ModalSubmitted(event) => format!(
                "card:{}:{}",
                event.context.channel_id, event.context.message_ts
            ),
        }
    }

    pub(super) fn kind_label(&self) -> &'static str {
        match self {
            Self::LinkMentioned(_) => "link_mentioned",
            Self::ActionInvoked(_) => "action_invoked",
            Self::ModalSubmitted(_) => "modal_submitted",
        }
    }
}

pub(super) fn parse_socket_envelope(message: WsMessage) -> Result<Option<SlackSocketEnvelope>> {
    match message {
        WsMessage::Text(text) => {
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Binary(bytes) => {
            let text =
                String::from_utf8(bytes.to_vec()).context("invalid utf-8 slack socket payload")?;
            let envelope = serde_json::from_str::<SlackSocketEnvelope>(&text)
                .context("failed to parse slack socket envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct SlackEventCallbackEnvelope {
    #[serde(rename = "type")]
    callback_type: String,
    event_id: String,
    event_time: u64,
    event: SlackMessagePayload,
}

#[derive(Debug, Deserialize)]
struct SlackMessagePayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

pub(super) fn normalize_socket_envelope(
    envelope: &SlackSocketEnvelope,
    bot_user_id: &str,
    links: &PullRequestLinkMatcher,
) -> Result<Option<SlackBridgeEvent>> {
    match envelope.envelope_type.as_str() {
        "events_api" => normalize_message_event(envelope, bot_user_id, links),
        "interactive" => normalize_interactive_payload(envelope),
        _ => Ok(None),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn normalize_message_event(
    envelope: &SlackSocketEnvelope,
    bot_user_id: &str,
    links: &PullRequestLinkMatcher,
) -> Result<Option<SlackBridgeEvent>> {
    let callback = serde_json::from_value::<SlackEventCallbackEnvelope>(envelope.payload.clone())
        .context("failed to decode slack event callback payload")?;
    if callback.callback_type != "event_callback" {
        return Ok(None);
    }

    let event = callback.event;
    if event.event_type != "message" || event.subtype.is_some() || event.bot_id.is_some() {
        return Ok(None);
    }
    let Some(user_id) = non_empty(event.user) else {
        return Ok(None);
    };
    if user_id == bot_user_id {
        return Ok(None);
    }
    let Some(channel_id) = non_empty(event.channel) else {
        return Ok(None);
    };
    let Some(message_ts) = non_empty(event.ts) else {
        return Ok(None);
    };

    let found = links.find_links(event.text.as_deref().unwrap_or_default());
    if found.is_empty() {
        return Ok(None);
    }

    Ok(Some(SlackBridgeEvent::LinkMentioned(LinkMentioned {
        key: format!("event:{}", callback.event_id),
        occurred_unix_ms: callback.event_time.saturating_mul(1000),
        channel_id,
        message_ts,
        thread_ts: non_empty(event.thread_ts),
        user_id,
        links: found,
    })))
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required_str(value: &Value, pointer: &str) -> Result<String> {
    str_at(value, pointer)
        .map(ToOwned::to_owned)
        .with_context(|| format!("slack interactive payload is missing {pointer}"))
}

fn normalize_interactive_payload(envelope: &SlackSocketEnvelope) -> Result<Option<SlackBridgeEvent>> {
    let payload = &envelope.payload;
    let key = format!("envelope:{}", envelope.envelope_id);
    match str_at(payload, "/type") {
        Some("block_actions") => normalize_block_action(payload, key),
        Some("view_submission") => normalize_view_submission(payload, key),
        _ => Ok(None),
    }
}

fn normalize_block_action(payload: &Value, key: String) -> Result<Option<SlackBridgeEvent>> {
    let Some(action_id) = str_at(payload, "/actions/0/action_id") else {
        return Ok(None);
    };
    let Some(action) = CardAction::from_action_id(action_id) else {
        return Ok(None);
    };
    let routing_value = required_str(payload, "/actions/0/value")?;
    let routing = RoutingPayload::parse(&routing_value)
        .with_context(|| format!("invalid routing payload on {action_id}"))?;

    let thread_ts = str_at(payload, "/container/thread_ts")
        .or_else(|| str_at(payload, "/message/thread_ts"))
        .map(ToOwned::to_owned);
    Ok(Some(SlackBridgeEvent::ActionInvoked(ActionInvoked {
        key,
        occurred_unix_ms: str_at(payload, "/actions/0/action_ts").and_then(slack_ts_to_unix_ms),
        action,
        routing,
        channel_id: required_str(payload, "/channel/id")?,
        message_ts: required_str(payload, "/container/message_ts")?,
        thread_ts,
        user_id: required_str(payload, "/user/id")?,
        trigger_id: str_at(payload, "/trigger_id").map(ToOwned::to_owned),
    })))
}

fn normalize_view_submission(payload: &Value, key: String) -> Result<Option<SlackBridgeEvent>> {
    if str_at(payload, "/view/callback_id") != Some(REQUEST_CHANGES_CALLBACK_ID) {
        return Ok(None);
    }
    let metadata = required_str(payload, "/view/private_metadata")?;
    let context = ModalContext::from_private_metadata(&metadata)
        .context("invalid request-changes modal metadata")?;
    let comment = payload
        .pointer("/view/state/values")
        .and_then(extract_modal_comment);
    Ok(Some(SlackBridgeEvent::ModalSubmitted(ModalSubmitted {
        key,
        context,
        comment,
        user_id: required_str(payload, "/user/id")?,
    })))
}

pub(super) fn event_is_stale(
    event: &SlackBridgeEvent,
    max_event_age_seconds: u64,
    now_unix_ms: u64,
) -> bool {
    if max_event_age_seconds == 0 {
        return false;
    }
    let Some(occurred_unix_ms) = event.occurred_unix_ms() else {
        return false;
    };
    let max_age_ms = max_event_age_seconds.saturating_mul(1000);
    now_unix_ms.saturating_sub(occurred_unix_ms) > max_age_ms
}
