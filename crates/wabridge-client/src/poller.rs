//! Inbound event poller.
//!
//! A single long-running task that fetches pending events from the
//! addon and feeds them to the registered callbacks. The loop never
//! propagates an error: every failure is logged, converted into a
//! backoff delay, and the next iteration tries again, so the poller
//! survives addon restarts and network outages indefinitely.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock as SyncRwLock;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use wabridge_core::{BridgeError, InboundEvent, Result, StatsTracker};

use crate::client::{check_response, EventCallback, AUTH_HEADER};

/// Default interval between event fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Timeout for one `/events` fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra sleep after an authentication failure.
const AUTH_BACKOFF: Duration = Duration::from_secs(10);

/// Extra sleep after any other fetch error.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Everything the poll task needs, captured at start.
pub(crate) struct PollContext {
    /// Full `/events` URL including the session query parameter.
    pub events_url: String,
    pub api_key: Option<String>,
    pub callbacks: Arc<SyncRwLock<Vec<EventCallback>>>,
    pub stats: Arc<StatsTracker>,
}

/// Owner of the poll task and its transport session.
///
/// Stopped → Running → Stopped; `start` while running is a no-op,
/// `stop` while stopped is safe.
pub(crate) struct EventPoller {
    running: Arc<RwLock<bool>>,
    handle: RwLock<Option<JoinHandle<()>>>,
    shutdown: RwLock<Option<watch::Sender<bool>>>,
}

impl EventPoller {
    pub fn new() -> Self {
        Self {
            running: Arc::new(RwLock::new(false)),
            handle: RwLock::new(None),
            shutdown: RwLock::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Start the poll loop. Idempotent.
    pub async fn start(&self, context: PollContext, interval: Duration) {
        let mut running = self.running.write().await;
        if *running {
            return;
        }
        *running = true;
        drop(running);

        let (tx, rx) = watch::channel(false);
        *self.shutdown.write().await = Some(tx);

        let running_flag = self.running.clone();
        let task = tokio::spawn(async move {
            poll_loop(context, interval, rx).await;
            *running_flag.write().await = false;
        });

        *self.handle.write().await = Some(task);
        tracing::debug!(interval_secs = interval.as_secs(), "event poller started");
    }

    /// Signal shutdown, await loop termination, and drop the session.
    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown.write().await.take() {
            let _ = tx.send(true);
        }

        let task = self.handle.write().await.take();
        if let Some(task) = task {
            task.await.ok();
        }

        *self.running.write().await = false;
        tracing::debug!("event poller stopped");
    }
}

async fn poll_loop(context: PollContext, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    // The poll session; recreated lazily if it goes away.
    let mut http: Option<reqwest::Client> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let client = http.get_or_insert_with(reqwest::Client::new);
        match fetch_events(client, &context).await {
            Ok(events) => {
                if !events.is_empty() {
                    tracing::debug!(count = events.len(), "inbound events fetched");
                }
                // Snapshot the callback list so a callback may register
                // another without deadlocking.
                let callbacks: Vec<EventCallback> = context.callbacks.read().clone();
                for event in events {
                    context.stats.record_received();
                    for callback in &callbacks {
                        callback(event.clone());
                    }
                }
            }
            Err(BridgeError::Auth(detail)) => {
                tracing::warn!(%detail, "event poll rejected: invalid credentials");
                if sleep_or_shutdown(&mut shutdown, AUTH_BACKOFF).await {
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "event poll failed");
                if sleep_or_shutdown(&mut shutdown, ERROR_BACKOFF).await {
                    break;
                }
            }
        }

        if sleep_or_shutdown(&mut shutdown, interval).await {
            break;
        }
    }
}

/// Sleep for `duration`, returning `true` when shutdown was signalled
/// before the sleep completed.
async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        _ = shutdown.changed() => true,
    }
}

async fn fetch_events(client: &reqwest::Client, context: &PollContext) -> Result<Vec<InboundEvent>> {
    let mut request = client.get(&context.events_url).timeout(FETCH_TIMEOUT);
    if let Some(key) = &context.api_key {
        request = request.header(AUTH_HEADER, key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))?;
    let response = check_response(response).await?;

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| BridgeError::Decode(e.to_string()))?;

    let Some(items) = body.as_array() else {
        tracing::debug!("event poll returned a non-list body, ignoring");
        return Ok(Vec::new());
    };

    let mut events = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<InboundEvent>(item.clone()) {
            Ok(event) => events.push(event),
            Err(err) => tracing::debug!(error = %err, "skipping undecodable event"),
        }
    }
    Ok(events)
}
