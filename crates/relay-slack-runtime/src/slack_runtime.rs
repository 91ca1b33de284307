//! Slack bridge runtime that posts pull-request cards and applies review decisions.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_card::{
    apply_outcome, ensure_transitionable, normalize_review_request, render_card,
    render_card_fallback_text, render_outcome_fallback_text, request_changes_modal, Card,
    CardAction, ModalContext, OutcomeEvent, RoutingPayload,
};
use relay_github::{Credential, CredentialResolver, ReviewPlatform};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::slack_helpers::current_unix_timestamp_ms;

#[derive(Clone)]
/// Runtime configuration for the Slack bridge transport loop.
pub struct SlackBridgeRuntimeConfig {
    pub platform: Arc<dyn ReviewPlatform>,
    pub credentials: Arc<dyn CredentialResolver>,
    pub api_base: String,
    pub app_token: String,
    pub bot_token: String,
    pub bot_user_id: Option<String>,
    pub github_web_host: String,
    pub require_write_access: bool,
    pub request_timeout_ms: u64,
    pub processed_event_cap: usize,
    pub max_event_age_seconds: u64,
    pub reconnect_delay: Duration,
}

mod slack_api_client;
mod slack_event_dedupe;
mod slack_event_parsing;
mod slack_render_helpers;

use slack_api_client::{SlackApiClient, SlackPostedMessage};
use slack_event_dedupe::ProcessedEventStore;
use slack_event_parsing::{
    event_is_stale, normalize_socket_envelope, parse_socket_envelope, ActionInvoked,
    LinkMentioned, ModalSubmitted, PullRequestLinkMatcher, SlackBridgeEvent, SlackSocketEnvelope,
};
use slack_render_helpers::{
    render_link_card_failure_notice, render_link_failure_notice, ReviewActionError,
};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
pub(crate) struct PollCycleReport {
    pub discovered_events: usize,
    pub queued_events: usize,
    pub posted_cards: usize,
    pub updated_cards: usize,
    pub opened_modals: usize,
    pub rejected_actions: usize,
    pub skipped_duplicate_events: usize,
    pub skipped_stale_events: usize,
    pub ignored_events: usize,
    pub failed_events: usize,
}

impl PollCycleReport {
    fn has_activity(&self) -> bool {
        self.queued_events > 0
            || self.posted_cards > 0
            || self.updated_cards > 0
            || self.opened_modals > 0
            || self.rejected_actions > 0
            || self.skipped_duplicate_events > 0
            || self.skipped_stale_events > 0
            || self.failed_events > 0
    }

    /// Folds the counters produced by a finished handler task into this cycle.
    fn absorb(&mut self, task: &PollCycleReport) {
        self.posted_cards = self.posted_cards.saturating_add(task.posted_cards);
        self.updated_cards = self.updated_cards.saturating_add(task.updated_cards);
        self.opened_modals = self.opened_modals.saturating_add(task.opened_modals);
        self.rejected_actions = self.rejected_actions.saturating_add(task.rejected_actions);
        self.failed_events = self.failed_events.saturating_add(task.failed_events);
    }
}

/// Message holding a card, plus the thread it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CardLocation {
    channel_id: String,
    message_ts: String,
    thread_ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingReview {
    Approve,
    RequestChanges { comment: String },
}

/// Runs the Slack bridge transport loop until ctrl-c.
pub async fn run_slack_bridge(config: SlackBridgeRuntimeConfig) -> Result<()> {
    let mut runtime = SlackBridgeRuntime::new(config).await?;
    runtime.run().await
}

struct ActiveEventTask {
    event_key: String,
    handle: JoinHandle<PollCycleReport>,
}

struct SlackBridgeRuntime {
    config: SlackBridgeRuntimeConfig,
    worker: Arc<BridgeWorker>,
    processed: ProcessedEventStore,
    links: PullRequestLinkMatcher,
    bot_user_id: String,
    event_queues: HashMap<String, VecDeque<SlackBridgeEvent>>,
    active_tasks: HashMap<String, ActiveEventTask>,
}

/// Everything a handler task needs; shared by every spawned task.
struct BridgeWorker {
    platform: Arc<dyn ReviewPlatform>,
    credentials: Arc<dyn CredentialResolver>,
    slack_client: SlackApiClient,
    require_write_access: bool,
}

impl SlackBridgeRuntime {
    async fn new(config: SlackBridgeRuntimeConfig) -> Result<Self> {
        let slack_client = SlackApiClient::new(
            config.api_base.clone(),
            config.app_token.clone(),
            config.bot_token.clone(),
            config.request_timeout_ms,
        )?;
        let links = PullRequestLinkMatcher::new(&config.github_web_host)?;

        let bot_user_id = match config.bot_user_id.clone() {
            Some(user_id) if !user_id.trim().is_empty() => user_id.trim().to_string(),
            _ => slack_client.resolve_bot_user_id().await?,
        };

        let worker = Arc::new(BridgeWorker {
            platform: config.platform.clone(),
            credentials: config.credentials.clone(),
            slack_client,
            require_write_access: config.require_write_access,
        });

        Ok(Self {
            processed: ProcessedEventStore::new(config.processed_event_cap),
            config,
            worker,
            links,
            bot_user_id,
            event_queues: HashMap::new(),
            active_tasks: HashMap::new(),
        })
    }

    async fn run(&mut self) -> Result<()> {
        let mut failure_streak = 0_usize;
        loop {
            match self.worker.slack_client.open_socket_connection().await {
                Ok(socket_url) => {
                    tracing::info!(bot_user_id = %self.bot_user_id, "slack bridge socket connected");
                    match self.run_socket_session(&socket_url).await {
                        Ok(SessionEnd::Shutdown) => {
                            tracing::info!("slack bridge shutdown requested");
                            return Ok(());
                        }
                        Ok(SessionEnd::Reconnect) => failure_streak = 0,
                        Err(error) => {
                            failure_streak = failure_streak.saturating_add(1);
                            tracing::warn!(
                                failure_streak,
                                error = %format!("{error:#}"),
                                "slack bridge socket session error"
                            );
                        }
                    }
                }
                Err(error) => {
                    failure_streak = failure_streak.saturating_add(1);
                    tracing::warn!(
                        failure_streak,
                        error = %format!("{error:#}"),
                        "slack bridge failed to open socket connection"
                    );
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("slack bridge shutdown requested");
                    let mut report = PollCycleReport::default();
                    self.finish_in_flight(&mut report).await;
                    self.log_cycle(&report);
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }
    }

    async fn run_socket_session(&mut self, socket_url: &str) -> Result<SessionEnd> {
        let (stream, _response) = connect_async(socket_url)
            .await
            .with_context(|| "failed to connect slack socket mode websocket")?;
        let (mut sink, mut source) = stream.split();

        loop {
            let mut report = PollCycleReport::default();
            self.drain_finished_tasks(&mut report).await;
            self.start_queued_tasks(&mut report);

            let session_end = tokio::select! {
                _ = tokio::signal::ctrl_c() => Some(SessionEnd::Shutdown),
                maybe_message = source.next() => {
                    match maybe_message {
                        None => Some(SessionEnd::Reconnect),
                        Some(message_result) => {
                            let message =
                                message_result.context("failed reading slack websocket message")?;
                            match parse_socket_envelope(message)? {
                                Some(envelope) if envelope.envelope_type == "disconnect" => {
                                    tracing::info!("slack requested socket reconnect");
                                    Some(SessionEnd::Reconnect)
                                }
                                Some(envelope) => {
                                    // Acknowledge before any mutating work so Slack does not redeliver.
                                    if !envelope.envelope_id.is_empty() {
                                        self.ack_envelope(&mut sink, &envelope.envelope_id).await?;
                                    }
                                    self.handle_envelope(envelope, &mut report);
                                    None
                                }
                                None => None,
                            }
                        }
                    }
                }
                _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => None,
            };

            if session_end == Some(SessionEnd::Shutdown) {
                self.finish_in_flight(&mut report).await;
            }
            self.log_cycle(&report);
            if let Some(end) = session_end {
                return Ok(end);
            }
        }
    }

    fn log_cycle(&self, report: &PollCycleReport) {
        if report.has_activity() {
            tracing::info!(
                discovered = report.discovered_events,
                queued = report.queued_events,
                posted_cards = report.posted_cards,
                updated_cards = report.updated_cards,
                opened_modals = report.opened_modals,
                rejected_actions = report.rejected_actions,
                duplicate_skips = report.skipped_duplicate_events,
                stale_skips = report.skipped_stale_events,
                failed = report.failed_events,
                active_tasks = self.active_tasks.len(),
                processed_keys = self.processed.len(),
                "slack bridge cycle"
            );
        }
    }

    async fn ack_envelope<S>(&self, sink: &mut S, envelope_id: &str) -> Result<()>
    where
        S: futures_util::Sink<WsMessage> + Unpin,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let ack = json!({ "envelope_id": envelope_id }).to_string();
        sink.send(WsMessage::Text(ack.into()))
            .await
            .context("failed to send slack socket ack")
    }

    /// Filters an acknowledged envelope and queues the resulting event.
    ///
    /// Never waits on Slack or GitHub; handlers run on spawned tasks.
    fn handle_envelope(&mut self, envelope: SlackSocketEnvelope, report: &mut PollCycleReport) {
        let now_unix_ms = current_unix_timestamp_ms();
        report.discovered_events = report.discovered_events.saturating_add(1);

        let event = match normalize_socket_envelope(&envelope, &self.bot_user_id, &self.links) {
            Ok(Some(event)) => event,
            Ok(None) => {
                report.ignored_events = report.ignored_events.saturating_add(1);
                return;
            }
            Err(error) => {
                report.failed_events = report.failed_events.saturating_add(1);
                tracing::warn!(
                    envelope_id = %envelope.envelope_id,
                    envelope_type = %envelope.envelope_type,
                    error = %format!("{error:#}"),
                    "dropping malformed slack payload"
                );
                return;
            }
        };

        if !self.processed.mark_processed(event.key()) {
            report.skipped_duplicate_events = report.skipped_duplicate_events.saturating_add(1);
            return;
        }
        if event_is_stale(&event, self.config.max_event_age_seconds, now_unix_ms) {
            report.skipped_stale_events = report.skipped_stale_events.saturating_add(1);
            return;
        }

        tracing::debug!(key = event.key(), kind = event.kind_label(), "queued slack event");
        self.event_queues
            .entry(event.queue_key())
            .or_default()
            .push_back(event);
        self.start_queued_tasks(report);
    }

    fn start_queued_tasks(&mut self, report: &mut PollCycleReport) {
        let ready = self
            .event_queues
            .keys()
            .filter(|queue_key| !self.active_tasks.contains_key(*queue_key))
            .cloned()
            .collect::<Vec<_>>();

        for queue_key in ready {
            let Some(event) = self
                .event_queues
                .get_mut(&queue_key)
                .and_then(VecDeque::pop_front)
            else {
                continue;
            };
            if self
                .event_queues
                .get(&queue_key)
                .is_some_and(VecDeque::is_empty)
            {
                self.event_queues.remove(&queue_key);
            }

            let event_key = event.key().to_string();
            let worker = Arc::clone(&self.worker);
            let handle = tokio::spawn(async move {
                let mut task_report = PollCycleReport::default();
                worker.handle_event(event, &mut task_report).await;
                task_report
            });
            self.active_tasks
                .insert(queue_key, ActiveEventTask { event_key, handle });
            report.queued_events = report.queued_events.saturating_add(1);
        }
    }

    async fn drain_finished_tasks(&mut self, report: &mut PollCycleReport) {
        let finished = self
            .active_tasks
            .iter()
            .filter_map(|(queue_key, task)| task.handle.is_finished().then_some(queue_key.clone()))
            .collect::<Vec<_>>();
        for queue_key in finished {
            if let Some(task) = self.active_tasks.remove(&queue_key) {
                Self::collect_task(task, report).await;
            }
        }
    }

    /// Waits for every queued and running handler.
    async fn finish_in_flight(&mut self, report: &mut PollCycleReport) {
        loop {
            self.start_queued_tasks(report);
            if self.active_tasks.is_empty() {
                return;
            }
            let running = std::mem::take(&mut self.active_tasks);
            for task in running.into_values() {
                Self::collect_task(task, report).await;
            }
        }
    }

    async fn collect_task(task: ActiveEventTask, report: &mut PollCycleReport) {
        match task.handle.await {
            Ok(task_report) => report.absorb(&task_report),
            Err(error) => {
                report.failed_events = report.failed_events.saturating_add(1);
                tracing::warn!(
                    key = %task.event_key,
                    error = %error,
                    "slack event task join error"
                );
            }
        }
    }
}

impl BridgeWorker {
    async fn handle_event(&self, event: SlackBridgeEvent, report: &mut PollCycleReport) {
        tracing::debug!(key = event.key(), kind = event.kind_label(), "handling slack event");
        match event {
            SlackBridgeEvent::LinkMentioned(event) => self.handle_link_mentioned(&event, report).await,
            SlackBridgeEvent::ActionInvoked(event) => self.handle_action_invoked(&event, report).await,
            SlackBridgeEvent::ModalSubmitted(event) => {
                self.handle_modal_submitted(&event, report).await
            }
        }
    }

    async fn handle_link_mentioned(&self, event: &LinkMentioned, report: &mut PollCycleReport) {
        for link in &event.links {
            match self.post_review_card(event, link).await {
                Ok(posted) => {
                    report.posted_cards = report.posted_cards.saturating_add(1);
                    tracing::info!(
                        pull_request = %link.slug(),
                        channel = %posted.channel,
                        card_ts = %posted.ts,
                        "posted review card"
                    );
                }
                Err(error) => {
                    report.failed_events = report.failed_events.saturating_add(1);
                    tracing::warn!(
                        pull_request = %link.slug(),
                        channel = %event.channel_id,
                        reason_code = error.reason_code(),
                        error = %error,
                        "failed to post review card"
                    );
                    let notice = match &error {
                        ReviewActionError::Github(github_error) => {
                            render_link_failure_notice(link, github_error)
                        }
                        ReviewActionError::Card(_) => render_link_card_failure_notice(link),
                        other => other.user_notice(),
                    };
                    self.notify(
                        &event.channel_id,
                        &event.user_id,
                        &notice,
                        event.thread_ts.as_deref(),
                    )
                    .await;
                }
            }
        }
    }

    async fn post_review_card(
        &self,
        event: &LinkMentioned,
        link: &RoutingPayload,
    ) -> Result<SlackPostedMessage, ReviewActionError> {
        let payload = self
            .platform
            .fetch_review_request(&link.owner, &link.repo, link.pull_number)
            .await?;
        let request = normalize_review_request(&payload)?;
        let card = render_card(&request, &link.owner, &link.repo, link.pull_number);
        let posted = self
            .slack_client
            .post_card(
                &event.channel_id,
                Some(event.reply_thread_ts()),
                &card.to_block_kit(),
                &render_card_fallback_text(&request),
            )
            .await?;
        Ok(posted)
    }

    async fn handle_action_invoked(&self, event: &ActionInvoked, report: &mut PollCycleReport) {
        let location = CardLocation {
            channel_id: event.channel_id.clone(),
            message_ts: event.message_ts.clone(),
            thread_ts: event.thread_ts.clone(),
        };
        let result = match event.action {
            // Link buttons open in the browser; the acknowledgement is all Slack needs.
            CardAction::ViewExternal => return,
            CardAction::Approve => self
                .apply_review_decision(
                    &location,
                    &event.routing,
                    &event.user_id,
                    PendingReview::Approve,
                )
                .await
                .map(|()| report.updated_cards = report.updated_cards.saturating_add(1)),
            CardAction::RequestChanges => self
                .open_request_changes_modal(event, &location)
                .await
                .map(|()| report.opened_modals = report.opened_modals.saturating_add(1)),
        };
        if let Err(error) = result {
            self.report_action_failure(&location, &event.user_id, &error, report)
                .await;
        }
    }

    async fn open_request_changes_modal(
        &self,
        event: &ActionInvoked,
        location: &CardLocation,
    ) -> Result<(), ReviewActionError> {
        self.resolve_credential(&event.user_id)?;
        let trigger_id = event
            .trigger_id
            .as_deref()
            .ok_or(ReviewActionError::MissingTrigger)?;
        // Trigger ids expire within seconds; the card itself is checked on submission.
        let context = ModalContext {
            routing: event.routing.clone(),
            channel_id: location.channel_id.clone(),
            message_ts: location.message_ts.clone(),
            thread_ts: location.thread_ts.clone(),
        };
        self.slack_client
            .open_view(trigger_id, &request_changes_modal(&context))
            .await?;
        Ok(())
    }

    async fn handle_modal_submitted(&self, event: &ModalSubmitted, report: &mut PollCycleReport) {
        let context = &event.context;
        let location = CardLocation {
            channel_id: context.channel_id.clone(),
            message_ts: context.message_ts.clone(),
            thread_ts: context.thread_ts.clone(),
        };
        let result = match event.comment.clone() {
            Some(comment) => {
                self.apply_review_decision(
                    &location,
                    &context.routing,
                    &event.user_id,
                    PendingReview::RequestChanges { comment },
                )
                .await
            }
            None => Err(ReviewActionError::MissingComment),
        };
        match result {
            Ok(()) => report.updated_cards = report.updated_cards.saturating_add(1),
            Err(error) => {
                self.report_action_failure(&location, &event.user_id, &error, report)
                    .await
            }
        }
    }

    /// Submits a review for `user_id` and rewrites the card to show the decision.
    ///
    /// The card is read back first so a card that is already decided, or that
    /// could not take the decision, never reaches GitHub.
    async fn apply_review_decision(
        &self,
        location: &CardLocation,
        routing: &RoutingPayload,
        user_id: &str,
        review: PendingReview,
    ) -> Result<(), ReviewActionError> {
        let credential = self.resolve_credential(user_id)?;
        let card = self.load_card(location).await?;
        ensure_transitionable(&card)?;
        self.ensure_write_access(routing, &credential).await?;
        let actor_name = self.display_name(user_id).await;

        let platform = &self.platform;
        let outcome = match review {
            PendingReview::Approve => {
                platform
                    .submit_approval(&routing.owner, &routing.repo, routing.pull_number, &credential)
                    .await?;
                OutcomeEvent::Approved { actor_name }
            }
            PendingReview::RequestChanges { comment } => {
                platform
                    .submit_changes_requested(
                        &routing.owner,
                        &routing.repo,
                        routing.pull_number,
                        &comment,
                        &credential,
                    )
                    .await?;
                OutcomeEvent::ChangesRequested {
                    actor_name,
                    comment: Some(comment),
                }
            }
        };
        tracing::info!(
            pull_request = %routing.slug(),
            github_login = %credential.github_login,
            decision = ?outcome.decision(),
            "submitted github review"
        );

        let updated = apply_outcome(&card, &outcome)?;
        self.slack_client
            .update_card(
                &location.channel_id,
                &location.message_ts,
                &updated.to_block_kit(),
                &render_outcome_fallback_text(&outcome),
            )
            .await?;
        Ok(())
    }

    fn resolve_credential(&self, user_id: &str) -> Result<Credential, ReviewActionError> {
        self.credentials
            .resolve_credential(user_id)
            .ok_or_else(|| ReviewActionError::MissingCredential {
                user_id: user_id.to_string(),
            })
    }

    async fn ensure_write_access(
        &self,
        routing: &RoutingPayload,
        credential: &Credential,
    ) -> Result<(), ReviewActionError> {
        if !self.require_write_access {
            return Ok(());
        }
        let allowed = self
            .platform
            .check_write_access(&routing.owner, &routing.repo, &credential.github_login)
            .await?;
        if !allowed {
            return Err(ReviewActionError::WriteAccessDenied {
                github_login: credential.github_login.clone(),
                slug: routing.slug(),
            });
        }
        Ok(())
    }

    async fn load_card(&self, location: &CardLocation) -> Result<Card, ReviewActionError> {
        let blocks = self
            .slack_client
            .fetch_message_blocks(
                &location.channel_id,
                &location.message_ts,
                location.thread_ts.as_deref(),
            )
            .await?
            .ok_or_else(|| ReviewActionError::CardNotFound {
                channel_id: location.channel_id.clone(),
                message_ts: location.message_ts.clone(),
            })?;
        Ok(Card::from_block_kit(&blocks))
    }

    async fn display_name(&self, user_id: &str) -> String {
        match self.slack_client.user_display_name(user_id).await {
            Ok(name) => name,
            Err(error) => {
                tracing::warn!(
                    user_id,
                    error = %format!("{error:#}"),
                    "falling back to slack user id for display name"
                );
                user_id.to_string()
            }
        }
    }

    async fn report_action_failure(
        &self,
        location: &CardLocation,
        user_id: &str,
        error: &ReviewActionError,
        report: &mut PollCycleReport,
    ) {
        report.rejected_actions = report.rejected_actions.saturating_add(1);
        tracing::warn!(
            channel = %location.channel_id,
            card_ts = %location.message_ts,
            user_id,
            reason_code = error.reason_code(),
            error = %error,
            "review action failed"
        );
        self.notify(
            &location.channel_id,
            user_id,
            &error.user_notice(),
            location.thread_ts.as_deref(),
        )
        .await;
    }

    async fn notify(&self, channel: &str, user_id: &str, text: &str, thread_ts: Option<&str>) {
        if let Err(error) = self
            .slack_client
            .post_ephemeral(channel, user_id, text, thread_ts)
            .await
        {
            tracing::warn!(
                channel,
                user_id,
                error = %format!("{error:#}"),
                "failed to post ephemeral notice"
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Reconnect,
}
