//! Snapshot flush to the remote collector.
//!
//! Each flush posts the whole current record. Nothing is cleared unless the
//! collector accepted it, so a failed flush is retried with cumulative data
//! by the next one. Delivery is at-least-once.

use crate::core::session::SessionModel;
use crate::core::state::SessionRecord;
use crate::error::Error;
use crate::http::HttpClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why a flush was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// Fixed-cadence timer.
    Timer,
    /// Buffered event count reached the threshold.
    Threshold,
    /// A prompt was just shown.
    PromptShown,
    /// The shopper answered a prompt.
    PromptAction,
    /// Page teardown.
    Unload,
    /// Operator request.
    Manual,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Timer => "timer",
            Self::Threshold => "threshold",
            Self::PromptShown => "prompt_shown",
            Self::PromptAction => "prompt_action",
            Self::Unload => "unload",
            Self::Manual => "manual",
        };
        f.write_str(label)
    }
}

/// Result of a flush attempt.
#[derive(Debug)]
pub enum FlushOutcome {
    /// Collector accepted the snapshot.
    Sent {
        /// Events in the snapshot.
        events: usize,
        /// Whether the local buffer was truncated.
        cleared: bool,
    },
    /// Nothing to send.
    Skipped,
    /// Transport or collector failure; nothing was cleared.
    Failed(Error),
}

impl FlushOutcome {
    /// Whether the collector accepted the snapshot.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

#[derive(Serialize)]
struct SnapshotPayload<'a> {
    reason: FlushReason,
    ts: i64,
    session: &'a str,
    state: &'a SessionRecord,
}

/// Posts session snapshots to the collector.
///
/// Flushing takes `&mut self`, so at most one flush is in flight.
pub struct Transport {
    endpoint: String,
    clear_after_send: bool,
    http: Arc<dyn HttpClient>,
}

impl Transport {
    /// Create a transport posting to `endpoint`.
    #[must_use]
    pub fn new(endpoint: &str, clear_after_send: bool, http: Arc<dyn HttpClient>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            clear_after_send,
            http,
        }
    }

    /// Send the current record.
    ///
    /// On success with clear-after-send, events are truncated; threshold
    /// flushes also truncate the time buckets.
    pub async fn flush(
        &mut self,
        reason: FlushReason,
        model: &mut SessionModel,
        now: DateTime<Utc>,
    ) -> FlushOutcome {
        let record = model.ensure();
        let events = record.total_event_count();
        if events == 0 {
            return FlushOutcome::Skipped;
        }

        let payload = SnapshotPayload {
            reason,
            ts: now.timestamp(),
            session: &record.session_id,
            state: &record,
        };
        let body = match serde_json::to_value(&payload) {
            Ok(body) => body,
            Err(e) => return FlushOutcome::Failed(e.into()),
        };

        let response = match self.http.post_json(&self.endpoint, &body).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%reason, error = %e, "flush failed");
                return FlushOutcome::Failed(e);
            }
        };
        if !response.is_success() {
            warn!(%reason, status = response.status, "collector rejected flush");
            return FlushOutcome::Failed(Error::Status(response.status));
        }

        if self.clear_after_send {
            model.clear_events(reason != FlushReason::Threshold);
        }
        debug!(%reason, events, "flushed session snapshot");
        FlushOutcome::Sent {
            events,
            cleared: self.clear_after_send,
        }
    }
}
