//! The addon REST client.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use wabridge_core::{
    jid, whitelist, BridgeError, ClientConfig, DispatchOutcome, InboundEvent, RemoteStats, Result,
    Stats, StatsTracker,
};

use crate::dispatch::{Button, ListSection, Presence, SendOperation, RETRY_DELAY, TEXT_TIMEOUT};
use crate::poller::{EventPoller, PollContext};

/// Header carrying the addon API key.
pub(crate) const AUTH_HEADER: &str = "X-Auth-Token";

/// Callback invoked once per inbound event, synchronously from the
/// poll loop.
pub type EventCallback = Arc<dyn Fn(InboundEvent) + Send + Sync>;

/// Response of the `/status` probe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    /// Whether the WhatsApp session is authenticated and usable.
    #[serde(default)]
    pub connected: bool,
    /// Free-form state string reported by the addon.
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of the `/qr` pairing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QrResponse {
    /// Pairing state: "connected", "waiting", or "scanning".
    pub status: String,
    /// Code payload to render, present while pairing is pending.
    #[serde(default)]
    pub qr: Option<String>,
}

/// One joined group as listed by `/groups`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group JID.
    pub id: String,
    /// Group subject.
    #[serde(default)]
    pub name: Option<String>,
    /// Participant count, when the addon reports it.
    #[serde(default)]
    pub participants: Option<u64>,
}

/// Client for the WhatsApp addon REST API.
///
/// One client per logical session. The client owns its configuration,
/// statistics, and poll session; collaborators read state through
/// snapshots and never mutate it directly.
pub struct WhatsAppClient {
    config: ClientConfig,
    whitelist: RwLock<Vec<String>>,
    retry_attempts: AtomicU32,
    http: reqwest::Client,
    stats: Arc<StatsTracker>,
    callbacks: Arc<RwLock<Vec<EventCallback>>>,
    poller: EventPoller,
    connected: AtomicBool,
}

impl WhatsAppClient {
    /// Create a client from the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        let whitelist = RwLock::new(config.whitelist.clone());
        let retry_attempts = AtomicU32::new(config.retry_attempts);
        Self {
            config,
            whitelist,
            retry_attempts,
            http: reqwest::Client::new(),
            stats: Arc::new(StatsTracker::new()),
            callbacks: Arc::new(RwLock::new(Vec::new())),
            poller: EventPoller::new(),
            connected: AtomicBool::new(false),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Replace the whitelist patterns.
    pub fn set_whitelist(&self, whitelist: Vec<String>) {
        *self.whitelist.write() = whitelist;
    }

    /// Replace the retry attempt count.
    pub fn set_retry_attempts(&self, retry_attempts: u32) {
        self.retry_attempts.store(retry_attempts, Ordering::Relaxed);
    }

    /// Last known connection state (updated by [`connect`](Self::connect)).
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Local statistics snapshot without a network round-trip.
    pub fn stats_snapshot(&self) -> Stats {
        self.stats.snapshot()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}?session_id={}",
            self.config.api_url(),
            path,
            urlencoding::encode(&self.config.session_id)
        )
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header(AUTH_HEADER, key),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.http.get(self.url(path)).timeout(TEXT_TIMEOUT);
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        let response = check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| BridgeError::Decode(e.to_string()))
    }

    async fn post_json(&self, path: &str, payload: &Value, timeout: Duration) -> Result<()> {
        let request = self.http.post(self.url(path)).timeout(timeout).json(payload);
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        check_response(response).await.map(|_| ())
    }

    // ── Connectivity & stats ──────────────────────────────────────────

    /// Probe the addon and return whether the session is connected.
    ///
    /// Authentication failures propagate; any other transport error is
    /// reported as disconnected without raising. Use
    /// [`connect_strict`](Self::connect_strict) from a reconnect loop
    /// that needs the underlying error.
    pub async fn connect(&self) -> Result<bool> {
        match self.probe_status().await {
            Ok(connected) => {
                self.connected.store(connected, Ordering::Relaxed);
                Ok(connected)
            }
            Err(err @ BridgeError::Auth(_)) => {
                self.connected.store(false, Ordering::Relaxed);
                Err(err)
            }
            Err(err) => {
                tracing::debug!(error = %err, "status probe failed, reporting disconnected");
                self.connected.store(false, Ordering::Relaxed);
                Ok(false)
            }
        }
    }

    /// Like [`connect`](Self::connect) but propagates every error.
    pub async fn connect_strict(&self) -> Result<bool> {
        match self.probe_status().await {
            Ok(connected) => {
                self.connected.store(connected, Ordering::Relaxed);
                Ok(connected)
            }
            Err(err) => {
                self.connected.store(false, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    async fn probe_status(&self) -> Result<bool> {
        let status: StatusResponse = self.get_json("/status").await?;
        Ok(status.connected)
    }

    /// Fetch addon-reported statistics, merge them over the local
    /// counters, and return the combined snapshot.
    pub async fn get_stats(&self) -> Result<Stats> {
        let remote: RemoteStats = self.get_json("/stats").await?;
        self.stats.merge_remote(&remote);
        Ok(self.stats.snapshot())
    }

    // ── Session management ────────────────────────────────────────────

    /// Retrieve the pairing state and QR code payload.
    pub async fn get_qr(&self) -> Result<QrResponse> {
        self.get_json("/qr").await
    }

    /// Ask the addon to (re)start session negotiation.
    pub async fn start_session(&self) -> Result<()> {
        self.post_json("/session/start", &json!({}), TEXT_TIMEOUT)
            .await
    }

    /// Terminate and reset the session on the addon side.
    pub async fn delete_session(&self) -> Result<()> {
        let request = self.http.delete(self.url("/session")).timeout(TEXT_TIMEOUT);
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        check_response(response).await.map(|_| ())
    }

    /// Configure a push-delivery webhook on the addon.
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        self.post_json("/settings/webhook", &json!({ "url": url }), TEXT_TIMEOUT)
            .await
    }

    /// List the groups the session has joined.
    pub async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
        self.get_json("/groups").await
    }

    // ── Inbound events ────────────────────────────────────────────────

    /// Register a callback for inbound events.
    ///
    /// Callbacks run synchronously inside the poll iteration, in
    /// registration order; a slow callback delays the next fetch.
    pub fn register_callback(&self, callback: EventCallback) {
        self.callbacks.write().push(callback);
    }

    /// Start the inbound event poller. No-op when already running.
    pub async fn start_polling(&self, interval: Duration) {
        let context = PollContext {
            events_url: self.url("/events"),
            api_key: self.config.api_key.clone(),
            callbacks: self.callbacks.clone(),
            stats: self.stats.clone(),
        };
        self.poller.start(context, interval).await;
    }

    /// Stop the inbound event poller. Safe to call when not running.
    pub async fn stop_polling(&self) {
        self.poller.stop().await;
    }

    /// Whether the event poller is currently running.
    pub async fn is_polling(&self) -> bool {
        self.poller.is_running().await
    }

    /// Stop background work and release transport resources. Safe to
    /// call multiple times.
    pub async fn close(&self) {
        self.stop_polling().await;
        self.connected.store(false, Ordering::Relaxed);
    }

    // ── Outbound dispatch ─────────────────────────────────────────────

    /// Dispatch one send operation: whitelist check, normalization,
    /// transport call, bounded retry, stats update.
    pub async fn send(&self, target: &str, operation: SendOperation) -> Result<()> {
        let shown = self.config.display_target(target);

        let entries = self.whitelist.read().clone();
        if !whitelist::is_allowed(target, &entries) {
            tracing::info!(
                target = %shown,
                outcome = DispatchOutcome::Blocked.as_str(),
                "recipient not on whitelist, blocking send"
            );
            return Err(BridgeError::Blocked(shown));
        }

        let recipient = jid::normalize(target);
        if recipient.is_empty() {
            return Err(BridgeError::InvalidTarget(shown));
        }

        let payload = operation.payload(&recipient);
        let retries = self.retry_attempts.load(Ordering::Relaxed);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self
                .post_json(operation.path(), &payload, operation.timeout())
                .await
            {
                Ok(()) => {
                    self.stats.record_sent(operation.summary(), &recipient);
                    tracing::debug!(
                        target = %shown,
                        endpoint = operation.path(),
                        outcome = DispatchOutcome::Sent.as_str(),
                        attempt,
                        "message dispatched"
                    );
                    return Ok(());
                }
                Err(err @ BridgeError::Auth(_)) => {
                    // Invalid credentials won't improve on retry.
                    return Err(err);
                }
                Err(err) if attempt <= retries => {
                    tracing::warn!(
                        target = %shown,
                        endpoint = operation.path(),
                        attempt,
                        error = %err,
                        "send failed, retrying"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(err) => {
                    self.stats
                        .record_failure(operation.summary(), &recipient, err.to_string());
                    tracing::warn!(
                        target = %shown,
                        endpoint = operation.path(),
                        outcome = DispatchOutcome::Failed.as_str(),
                        attempts = attempt,
                        error = %err,
                        "send failed terminally"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Send a plain text message.
    pub async fn send_message(
        &self,
        target: &str,
        message: &str,
        quoted_message_id: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Text {
                body: message.to_string(),
                quoted_message_id: quoted_message_id.map(str::to_string),
            },
        )
        .await
    }

    /// Send an image by URL.
    pub async fn send_image(
        &self,
        target: &str,
        url: &str,
        caption: Option<&str>,
        quoted_message_id: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Image {
                url: url.to_string(),
                caption: caption.map(str::to_string),
                quoted_message_id: quoted_message_id.map(str::to_string),
            },
        )
        .await
    }

    /// Send a poll.
    pub async fn send_poll(
        &self,
        target: &str,
        question: &str,
        options: Vec<String>,
        quoted_message_id: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Poll {
                question: question.to_string(),
                options,
                quoted_message_id: quoted_message_id.map(str::to_string),
            },
        )
        .await
    }

    /// Send a location pin.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_location(
        &self,
        target: &str,
        latitude: f64,
        longitude: f64,
        name: Option<&str>,
        address: Option<&str>,
        quoted_message_id: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Location {
                latitude,
                longitude,
                name: name.map(str::to_string),
                address: address.map(str::to_string),
                quoted_message_id: quoted_message_id.map(str::to_string),
            },
        )
        .await
    }

    /// React to an existing message.
    pub async fn send_reaction(&self, target: &str, reaction: &str, message_id: &str) -> Result<()> {
        self.send(
            target,
            SendOperation::Reaction {
                reaction: reaction.to_string(),
                message_id: message_id.to_string(),
            },
        )
        .await
    }

    /// Send a message with interactive buttons.
    pub async fn send_buttons(
        &self,
        target: &str,
        message: &str,
        buttons: Vec<Button>,
        footer: Option<&str>,
        quoted_message_id: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Buttons {
                body: message.to_string(),
                buttons,
                footer: footer.map(str::to_string),
                quoted_message_id: quoted_message_id.map(str::to_string),
            },
        )
        .await
    }

    /// Send a document by URL.
    pub async fn send_document(
        &self,
        target: &str,
        url: &str,
        file_name: Option<&str>,
        caption: Option<&str>,
        quoted_message_id: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Document {
                url: url.to_string(),
                file_name: file_name.map(str::to_string),
                caption: caption.map(str::to_string),
                quoted_message_id: quoted_message_id.map(str::to_string),
            },
        )
        .await
    }

    /// Send a video by URL.
    pub async fn send_video(
        &self,
        target: &str,
        url: &str,
        caption: Option<&str>,
        quoted_message_id: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Video {
                url: url.to_string(),
                caption: caption.map(str::to_string),
                quoted_message_id: quoted_message_id.map(str::to_string),
            },
        )
        .await
    }

    /// Send an audio clip by URL; `ptt` marks it as a voice note.
    pub async fn send_audio(
        &self,
        target: &str,
        url: &str,
        ptt: bool,
        quoted_message_id: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Audio {
                url: url.to_string(),
                ptt,
                quoted_message_id: quoted_message_id.map(str::to_string),
            },
        )
        .await
    }

    /// Send a sectioned list message.
    pub async fn send_list(
        &self,
        target: &str,
        message: &str,
        button_text: &str,
        sections: Vec<ListSection>,
        footer: Option<&str>,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::List {
                body: message.to_string(),
                button_text: button_text.to_string(),
                sections,
                footer: footer.map(str::to_string),
            },
        )
        .await
    }

    /// Send a contact card.
    pub async fn send_contact(
        &self,
        target: &str,
        contact_name: &str,
        contact_phone: &str,
    ) -> Result<()> {
        self.send(
            target,
            SendOperation::Contact {
                contact_name: contact_name.to_string(),
                contact_phone: contact_phone.to_string(),
            },
        )
        .await
    }

    /// Revoke (delete for everyone) a previously sent message.
    pub async fn revoke_message(&self, target: &str, message_id: &str) -> Result<()> {
        self.send(
            target,
            SendOperation::Revoke {
                message_id: message_id.to_string(),
            },
        )
        .await
    }

    /// Edit the body of a previously sent message.
    pub async fn edit_message(&self, target: &str, message_id: &str, message: &str) -> Result<()> {
        self.send(
            target,
            SendOperation::Edit {
                message_id: message_id.to_string(),
                body: message.to_string(),
            },
        )
        .await
    }

    /// Update our presence towards a chat.
    pub async fn set_presence(&self, target: &str, presence: Presence) -> Result<()> {
        self.send(target, SendOperation::SetPresence { presence })
            .await
    }

    /// Mark a message as read.
    pub async fn mark_as_read(&self, target: &str, message_id: &str) -> Result<()> {
        self.send(
            target,
            SendOperation::MarkRead {
                message_id: message_id.to_string(),
            },
        )
        .await
    }
}

/// Classify an addon response: 401 is always an authentication
/// failure, any other non-2xx a retryable remote rejection with a
/// best-effort detail string.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(BridgeError::Auth(error_detail(response).await));
    }
    if !status.is_success() {
        return Err(BridgeError::Remote {
            status: status.as_u16(),
            detail: error_detail(response).await,
        });
    }
    Ok(response)
}

/// Extract a human-readable error from a non-success body: prefer a
/// structured `detail` or `error` field, fall back to the raw text.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if let Ok(body) = serde_json::from_str::<Value>(&text) {
        for key in ["detail", "error"] {
            if let Some(detail) = body.get(key).and_then(Value::as_str) {
                return detail.to_string();
            }
        }
    }

    if text.trim().is_empty() {
        status.to_string()
    } else {
        text
    }
}
