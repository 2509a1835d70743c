//! Session report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ScoreWeights;
use crate::event::{Event, EventCounts, EventDetail, EventKind};
use crate::score::integrity_score;
use crate::session::SessionAggregator;
use crate::status::DetectionStatus;
use crate::IntegrityError;

/// Read-only snapshot of a stopped session; the only artifact handed to
/// exporters and persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Human-readable duration, e.g. "1h 02m 05s"
    pub duration: String,
    pub counts: EventCounts,
    pub integrity_score: u8,
    pub detection_status: DetectionStatus,
    /// Most recent events, most recent first
    pub events: Vec<Event>,
}

impl Report {
    /// Snapshot a frozen session
    pub fn build(
        aggregator: &SessionAggregator,
        weights: &ScoreWeights,
        event_limit: usize,
        detection_status: DetectionStatus,
    ) -> Result<Self, IntegrityError> {
        let session = aggregator.session();
        let ended_at = session.ended_at.ok_or(IntegrityError::SessionActive)?;

        Ok(Self {
            session_id: session.id,
            candidate_name: session.name.clone(),
            started_at: session.started_at,
            ended_at,
            duration_ms: session.duration_ms,
            duration: format_duration(session.duration_ms),
            counts: session.counts.clone(),
            integrity_score: integrity_score(&session.counts, weights),
            detection_status,
            events: aggregator.recent().read_last(event_limit),
        })
    }

    pub fn count(&self, kind: EventKind) -> u32 {
        self.counts.get(kind)
    }

    /// Final `session_report` event forwarded to the event sink
    pub fn summary_event(&self) -> Event {
        Event::new(
            self.ended_at,
            EventDetail::SessionReport {
                session_id: self.session_id,
                integrity_score: self.integrity_score,
                duration_ms: self.duration_ms,
                counts: self.counts.clone(),
            },
        )
    }
}

/// Format milliseconds as "1h 02m 05s", "2m 05s" or "5s"
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
