//! Metrics collection for liveclass.
//!
//! Provides process-wide counters for session lifecycle, admission and
//! in-session interaction, exported as JSON snapshots or Prometheus text.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get the global metrics instance.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Why a join attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    /// Session was not live.
    NotJoinable,
    /// Room was full.
    Capacity,
    /// Camera or microphone missing.
    Device,
}

/// Application metrics collector.
#[derive(Debug)]
pub struct Metrics {
    // === Lifecycle ===
    /// Sessions created
    pub sessions_created: AtomicU64,
    /// Sessions moved to live
    pub sessions_started: AtomicU64,
    /// Sessions completed with attendance computed
    pub sessions_completed: AtomicU64,
    /// Sessions cancelled
    pub sessions_cancelled: AtomicU64,

    // === Admission ===
    /// Joins admitted
    pub joins_admitted: AtomicU64,
    /// Joins rejected because the session was not live
    pub joins_rejected_not_joinable: AtomicU64,
    /// Joins rejected because the room was full
    pub joins_rejected_capacity: AtomicU64,
    /// Joins rejected for missing devices
    pub joins_rejected_device: AtomicU64,
    /// Joins that superseded a still-open interval
    pub joins_reconnected: AtomicU64,
    /// Leaves that closed an interval
    pub leaves_total: AtomicU64,

    // === Artifacts ===
    /// Polls created
    pub polls_created: AtomicU64,
    /// Poll responses recorded (including replacements)
    pub poll_responses: AtomicU64,
    /// Chat messages counted
    pub messages_recorded: AtomicU64,
    /// Whiteboard snapshots saved
    pub whiteboard_saves: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sessions_created: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            sessions_cancelled: AtomicU64::new(0),

            joins_admitted: AtomicU64::new(0),
            joins_rejected_not_joinable: AtomicU64::new(0),
            joins_rejected_capacity: AtomicU64::new(0),
            joins_rejected_device: AtomicU64::new(0),
            joins_reconnected: AtomicU64::new(0),
            leaves_total: AtomicU64::new(0),

            polls_created: AtomicU64::new(0),
            poll_responses: AtomicU64::new(0),
            messages_recorded: AtomicU64::new(0),
            whiteboard_saves: AtomicU64::new(0),
        }
    }

    /// Record an admitted join.
    pub fn record_join(&self, reconnected: bool) {
        self.joins_admitted.fetch_add(1, Ordering::Relaxed);
        if reconnected {
            self.joins_reconnected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a rejected join.
    pub fn record_join_rejected(&self, reason: JoinRejection) {
        let counter = match reason {
            JoinRejection::NotJoinable => &self.joins_rejected_not_joinable,
            JoinRejection::Capacity => &self.joins_rejected_capacity,
            JoinRejection::Device => &self.joins_rejected_device,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by one.
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_cancelled: self.sessions_cancelled.load(Ordering::Relaxed),
            joins_admitted: self.joins_admitted.load(Ordering::Relaxed),
            joins_rejected_not_joinable: self.joins_rejected_not_joinable.load(Ordering::Relaxed),
            joins_rejected_capacity: self.joins_rejected_capacity.load(Ordering::Relaxed),
            joins_rejected_device: self.joins_rejected_device.load(Ordering::Relaxed),
            joins_reconnected: self.joins_reconnected.load(Ordering::Relaxed),
            leaves_total: self.leaves_total.load(Ordering::Relaxed),
            polls_created: self.polls_created.load(Ordering::Relaxed),
            poll_responses: self.poll_responses.load(Ordering::Relaxed),
            messages_recorded: self.messages_recorded.load(Ordering::Relaxed),
            whiteboard_saves: self.whiteboard_saves.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        let counters: [(&str, &str, u64); 10] = [
            ("sessions_created", "Sessions created", snapshot.sessions_created),
            ("sessions_started", "Sessions started", snapshot.sessions_started),
            ("sessions_completed", "Sessions completed", snapshot.sessions_completed),
            ("sessions_cancelled", "Sessions cancelled", snapshot.sessions_cancelled),
            ("joins_admitted", "Joins admitted", snapshot.joins_admitted),
            ("joins_reconnected", "Joins superseding an open interval", snapshot.joins_reconnected),
            ("leaves_total", "Leaves closing an interval", snapshot.leaves_total),
            ("polls_created", "Polls created", snapshot.polls_created),
            ("poll_responses", "Poll responses recorded", snapshot.poll_responses),
            ("messages_recorded", "Chat messages counted", snapshot.messages_recorded),
        ];

        for (name, help, value) in counters {
            output.push_str(&format!("# HELP liveclass_{name} {help}\n"));
            output.push_str(&format!("# TYPE liveclass_{name} counter\n"));
            output.push_str(&format!("liveclass_{name} {value}\n"));
        }

        output.push_str("# HELP liveclass_joins_rejected Joins rejected by reason\n");
        output.push_str("# TYPE liveclass_joins_rejected counter\n");
        output.push_str(&format!(
            "liveclass_joins_rejected{{reason=\"not_joinable\"}} {}\n",
            snapshot.joins_rejected_not_joinable
        ));
        output.push_str(&format!(
            "liveclass_joins_rejected{{reason=\"capacity\"}} {}\n",
            snapshot.joins_rejected_capacity
        ));
        output.push_str(&format!(
            "liveclass_joins_rejected{{reason=\"device\"}} {}\n",
            snapshot.joins_rejected_device
        ));

        output.push_str("# HELP liveclass_whiteboard_saves Whiteboard snapshots saved\n");
        output.push_str("# TYPE liveclass_whiteboard_saves counter\n");
        output.push_str(&format!(
            "liveclass_whiteboard_saves {}\n",
            snapshot.whiteboard_saves
        ));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics at a point in time.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    // Lifecycle
    pub sessions_created: u64,
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub sessions_cancelled: u64,

    // Admission
    pub joins_admitted: u64,
    pub joins_rejected_not_joinable: u64,
    pub joins_rejected_capacity: u64,
    pub joins_rejected_device: u64,
    pub joins_reconnected: u64,
    pub leaves_total: u64,

    // Artifacts
    pub polls_created: u64,
    pub poll_responses: u64,
    pub messages_recorded: u64,
    pub whiteboard_saves: u64,
}
