//! Message statistics tracking.
//!
//! Local counters give an immediate view of what this process has
//! observed; the addon's aggregate counters (which survive restarts of
//! this process) are merged over them whenever a stats fetch succeeds.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Terminal state of one outbound dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    /// Delivered to the addon.
    Sent,
    /// Denied by the whitelist before any network call.
    Blocked,
    /// Terminal error after retries were exhausted.
    Failed,
}

impl DispatchOutcome {
    /// Outcome label for log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Blocked => "blocked",
            Self::Failed => "failed",
        }
    }
}

/// A point-in-time statistics snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Messages sent successfully.
    pub sent: u64,
    /// Inbound events received.
    pub received: u64,
    /// Sends that failed terminally.
    pub failed: u64,

    /// Body summary of the last successful send.
    pub last_sent_message: Option<String>,
    /// Recipient of the last successful send.
    pub last_sent_target: Option<String>,
    /// Body summary of the last failed send.
    pub last_failed_message: Option<String>,
    /// Recipient of the last failed send.
    pub last_failed_target: Option<String>,
    /// Reason string of the last failure.
    pub last_error_reason: Option<String>,

    /// Addon-reported uptime in seconds (opaque pass-through).
    pub uptime: Option<i64>,
    /// Addon-reported version string.
    pub version: Option<String>,
    /// Addon-reported own number.
    pub my_number: Option<String>,
}

/// Aggregate statistics as reported by the addon's `/stats` endpoint.
///
/// Every field is optional: keys absent from the response leave the
/// corresponding local value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteStats {
    #[serde(default)]
    pub sent: Option<u64>,
    #[serde(default)]
    pub received: Option<u64>,
    #[serde(default)]
    pub failed: Option<u64>,
    #[serde(default)]
    pub uptime: Option<i64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub my_number: Option<String>,
}

#[derive(Debug, Default)]
struct LastOps {
    last_sent_message: Option<String>,
    last_sent_target: Option<String>,
    last_failed_message: Option<String>,
    last_failed_target: Option<String>,
    last_error_reason: Option<String>,
    uptime: Option<i64>,
    version: Option<String>,
    my_number: Option<String>,
}

/// Concurrent statistics tracker.
///
/// Counters are relaxed atomics so overlapping dispatcher calls and
/// the poller can update them without coordination; the string fields
/// sit behind a short-lived mutex.
#[derive(Debug, Default)]
pub struct StatsTracker {
    sent: AtomicU64,
    received: AtomicU64,
    failed: AtomicU64,
    last: Mutex<LastOps>,
}

impl StatsTracker {
    /// Create a fresh tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful send.
    pub fn record_sent(&self, message: impl Into<String>, target: impl Into<String>) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last.lock();
        last.last_sent_message = Some(message.into());
        last.last_sent_target = Some(target.into());
    }

    /// Record a terminally failed send.
    pub fn record_failure(
        &self,
        message: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last.lock();
        last.last_failed_message = Some(message.into());
        last.last_failed_target = Some(target.into());
        last.last_error_reason = Some(reason.into());
    }

    /// Record one received inbound event.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Merge addon-reported aggregates over the local values.
    ///
    /// The addon is the source of truth for counts across restarts of
    /// this process; any key it reports overwrites the local value,
    /// absent keys retain theirs.
    pub fn merge_remote(&self, remote: &RemoteStats) {
        if let Some(sent) = remote.sent {
            self.sent.store(sent, Ordering::Relaxed);
        }
        if let Some(received) = remote.received {
            self.received.store(received, Ordering::Relaxed);
        }
        if let Some(failed) = remote.failed {
            self.failed.store(failed, Ordering::Relaxed);
        }

        let mut last = self.last.lock();
        if remote.uptime.is_some() {
            last.uptime = remote.uptime;
        }
        if remote.version.is_some() {
            last.version = remote.version.clone();
        }
        if remote.my_number.is_some() {
            last.my_number = remote.my_number.clone();
        }
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> Stats {
        let last = self.last.lock();
        Stats {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            last_sent_message: last.last_sent_message.clone(),
            last_sent_target: last.last_sent_target.clone(),
            last_failed_message: last.last_failed_message.clone(),
            last_failed_target: last.last_failed_target.clone(),
            last_error_reason: last.last_error_reason.clone(),
            uptime: last.uptime,
            version: last.version.clone(),
            my_number: last.my_number.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let tracker = StatsTracker::new();
        tracker.record_sent("hello", "49123@s.whatsapp.net");
        tracker.record_sent("again", "49123@s.whatsapp.net");
        tracker.record_failure("nope", "49999@s.whatsapp.net", "status 500");
        tracker.record_received();

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.sent, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.received, 1);
        assert_eq!(snapshot.last_sent_message.as_deref(), Some("again"));
        assert_eq!(
            snapshot.last_failed_target.as_deref(),
            Some("49999@s.whatsapp.net")
        );
        assert_eq!(snapshot.last_error_reason.as_deref(), Some("status 500"));
    }

    #[test]
    fn test_merge_overrides_present_keys() {
        let tracker = StatsTracker::new();
        tracker.record_sent("hi", "49123@s.whatsapp.net");
        tracker.record_received();

        let remote = RemoteStats {
            sent: Some(42),
            version: Some("1.2.3".into()),
            ..Default::default()
        };
        tracker.merge_remote(&remote);

        let snapshot = tracker.snapshot();
        // Present keys overwritten.
        assert_eq!(snapshot.sent, 42);
        assert_eq!(snapshot.version.as_deref(), Some("1.2.3"));
        // Absent keys retain local values.
        assert_eq!(snapshot.received, 1);
        assert_eq!(snapshot.failed, 0);
        assert_eq!(snapshot.last_sent_message.as_deref(), Some("hi"));
    }

    #[test]
    fn test_merge_is_repeatable() {
        let tracker = StatsTracker::new();
        tracker.merge_remote(&RemoteStats {
            sent: Some(10),
            my_number: Some("49123".into()),
            ..Default::default()
        });
        tracker.merge_remote(&RemoteStats {
            sent: Some(11),
            ..Default::default()
        });

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.sent, 11);
        assert_eq!(snapshot.my_number.as_deref(), Some("49123"));
    }

    #[test]
    fn test_remote_stats_tolerates_unknown_fields() {
        let remote: RemoteStats = serde_json::from_str(
            r#"{"sent": 3, "uptime": 120, "qr_scans": 7, "whatever": {"nested": true}}"#,
        )
        .unwrap();
        assert_eq!(remote.sent, Some(3));
        assert_eq!(remote.uptime, Some(120));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(DispatchOutcome::Sent.as_str(), "sent");
        assert_eq!(DispatchOutcome::Blocked.as_str(), "blocked");
        assert_eq!(DispatchOutcome::Failed.as_str(), "failed");
    }
}
