//! Slack Web API client used for posting, reading back, and updating cards.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use relay_card::card_text::truncate_chars;

#[derive(Debug, Clone, Deserialize)]
struct SlackAuthTestResponse {
    ok: bool,
    user_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackOpenSocketResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackOkResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackStoredMessage {
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    blocks: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackMessagesResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<SlackStoredMessage>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUserProfile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlackUserInfoResponse {
    ok: bool,
    user: Option<SlackUserProfile>,
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SlackPostedMessage {
    pub(super) channel: String,
    pub(super) ts: String,
}

#[derive(Clone)]
pub(super) struct SlackApiClient {
    http: reqwest::Client,
    api_base: String,
    app_token: String,
    bot_token: String,
}

fn ensure_slack_ok(method: &str, ok: bool, error: Option<String>) -> Result<()> {
    if !ok {
        bail!(
            "slack {method} failed: {}",
            error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}

impl SlackApiClient {
    pub(super) fn new(
        api_base: String,
        app_token: String,
        bot_token: String,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("pr-relay"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create slack api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            app_token: app_token.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
        })
    }

    pub(super) async fn resolve_bot_user_id(&self) -> Result<String> {
        let response: SlackAuthTestResponse = self
            .request_json(
                "auth.test",
                self.http
                    .post(format!("{}/auth.test", self.api_base))
                    .bearer_auth(&self.bot_token),
            )
            .await?;
        ensure_slack_ok("auth.test", response.ok, response.error)?;
        response
            .user_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack auth.test did not return user_id"))
    }

    pub(super) async fn open_socket_connection(&self) -> Result<String> {
        let response: SlackOpenSocketResponse = self
            .request_json(
                "apps.connections.open",
                self.http
                    .post(format!("{}/apps.connections.open", self.api_base))
                    .bearer_auth(&self.app_token),
            )
            .await?;
        ensure_slack_ok("apps.connections.open", response.ok, response.error)?;
        response
            .url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("slack apps.connections.open did not return url"))
    }

    /// Posts a card, threaded under `thread_ts` when given.
    pub(super) async fn post_card(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        blocks: &[Value],
        text: &str,
    ) -> Result<SlackPostedMessage> {
        let mut payload = json!({
            "channel": channel,
            "blocks": blocks,
            "text": text,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }

        let response: SlackChatMessageResponse = self
            .request_json(
                "chat.postMessage",
                self.http
                    .post(format!("{}/chat.postMessage", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload),
            )
            .await?;
        ensure_slack_ok("chat.postMessage", response.ok, response.error)?;
        Ok(SlackPostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response
                .ts
                .ok_or_else(|| anyhow!("slack chat.postMessage response missing ts"))?,
        })
    }

    pub(super) async fn update_card(
        &self,
        channel: &str,
        ts: &str,
        blocks: &[Value],
        text: &str,
    ) -> Result<SlackPostedMessage> {
        let payload = json!({
            "channel": channel,
            "ts": ts,
            "blocks": blocks,
            "text": text,
        });
        let response: SlackChatMessageResponse = self
            .request_json(
                "chat.update",
                self.http
                    .post(format!("{}/chat.update", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload),
            )
            .await?;
        ensure_slack_ok("chat.update", response.ok, response.error)?;
        Ok(SlackPostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts: response.ts.unwrap_or_else(|| ts.to_string()),
        })
    }

    pub(super) async fn post_ephemeral(
        &self,
        channel: &str,
        user: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({
            "channel": channel,
            "user": user,
            "text": text,
        });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = Value::String(thread_ts.to_string());
        }
        let response: SlackOkResponse = self
            .request_json(
                "chat.postEphemeral",
                self.http
                    .post(format!("{}/chat.postEphemeral", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload),
            )
            .await?;
        ensure_slack_ok("chat.postEphemeral", response.ok, response.error)
    }

    pub(super) async fn open_view(&self, trigger_id: &str, view: &Value) -> Result<()> {
        let payload = json!({
            "trigger_id": trigger_id,
            "view": view,
        });
        let response: SlackOkResponse = self
            .request_json(
                "views.open",
                self.http
                    .post(format!("{}/views.open", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .json(&payload),
            )
            .await?;
        ensure_slack_ok("views.open", response.ok, response.error)
    }

    /// Reads back the stored blocks of one message.
    ///
    /// Threaded messages are only reachable through `conversations.replies`;
    /// top-level messages use `conversations.history`. Returns `None` when
    /// Slack no longer has a message with that timestamp.
    pub(super) async fn fetch_message_blocks(
        &self,
        channel: &str,
        message_ts: &str,
        thread_ts: Option<&str>,
    ) -> Result<Option<Vec<Value>>> {
        let (method, request) = match thread_ts {
            Some(thread_ts) => (
                "conversations.replies",
                self.http
                    .get(format!("{}/conversations.replies", self.api_base))
                    .query(&[
                        ("channel", channel),
                        ("ts", thread_ts),
                        ("oldest", message_ts),
                        ("latest", message_ts),
                        ("inclusive", "true"),
                    ]),
            ),
            None => (
                "conversations.history",
                self.http
                    .get(format!("{}/conversations.history", self.api_base))
                    .query(&[
                        ("channel", channel),
                        ("oldest", message_ts),
                        ("latest", message_ts),
                        ("inclusive", "true"),
                        ("limit", "1"),
                    ]),
            ),
        };
        let response: SlackMessagesResponse = self
            .request_json(method, request.bearer_auth(&self.bot_token))
            .await?;
        ensure_slack_ok(method, response.ok, response.error)?;
        Ok(response
            .messages
            .into_iter()
            .find(|message| message.ts.as_deref() == Some(message_ts))
            .map(|message| message.blocks))
    }

    /// Returns `real_name`, falling back to the handle, then the raw user id.
    pub(super) async fn user_display_name(&self, user_id: &str) -> Result<String> {
        let response: SlackUserInfoResponse = self
            .request_json(
                "users.info",
                self.http
                    .get(format!("{}/users.info", self.api_base))
                    .bearer_auth(&self.bot_token)
                    .query(&[("user", user_id)]),
            )
            .await?;
        ensure_slack_ok("users.info", response.ok, response.error)?;
        let profile = response.user;
        let display_name = profile
            .as_ref()
            .and_then(|user| user.real_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| {
                profile
                    .as_ref()
                    .and_then(|user| user.name.as_deref())
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or(user_id);
        Ok(display_name.to_string())
    }

    async fn request_json<T>(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .with_context(|| format!("slack api {operation} request failed"))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .with_context(|| format!("failed to decode slack {operation}"));
        }

        let body = response.text().await.unwrap_or_default();
        bail!(
            "slack api {operation} failed with status {}: {}",
            status.as_u16(),
            truncate_chars(&body, 800)
        );
    }
}
