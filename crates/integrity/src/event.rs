//! Session events and per-kind counters

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use perception::FaceBox;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStart,
    LookingAway,
    NoFace,
    MultipleFaces,
    ObjectDetected,
    SessionReport,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::SessionStart,
        EventKind::LookingAway,
        EventKind::NoFace,
        EventKind::MultipleFaces,
        EventKind::ObjectDetected,
        EventKind::SessionReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionStart => "session_start",
            EventKind::LookingAway => "looking_away",
            EventKind::NoFace => "no_face",
            EventKind::MultipleFaces => "multiple_faces",
            EventKind::ObjectDetected => "object_detected",
            EventKind::SessionReport => "session_report",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload, serialized as `{"type": ..., "detail": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum EventDetail {
    SessionStart {
        session_id: Uuid,
        candidate: String,
    },
    LookingAway {
        duration_ms: u64,
    },
    NoFace {
        duration_ms: u64,
    },
    MultipleFaces {
        count: usize,
    },
    ObjectDetected {
        /// Debounce reason (flagged label or heuristic tag)
        object: String,
        /// Raw label from the object model
        model_class: String,
        score: f32,
        #[serde(rename = "box")]
        bbox: FaceBox,
    },
    SessionReport {
        session_id: Uuid,
        integrity_score: u8,
        duration_ms: u64,
        counts: EventCounts,
    },
}

impl EventDetail {
    pub fn kind(&self) -> EventKind {
        match self {
            EventDetail::SessionStart { .. } => EventKind::SessionStart,
            EventDetail::LookingAway { .. } => EventKind::LookingAway,
            EventDetail::NoFace { .. } => EventKind::NoFace,
            EventDetail::MultipleFaces { .. } => EventKind::MultipleFaces,
            EventDetail::ObjectDetected { .. } => EventKind::ObjectDetected,
            EventDetail::SessionReport { .. } => EventKind::SessionReport,
        }
    }
}

/// Immutable session event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: EventDetail,
}

impl Event {
    pub fn new(timestamp: DateTime<Utc>, detail: EventDetail) -> Self {
        Self { timestamp, detail }
    }

    pub fn kind(&self) -> EventKind {
        self.detail.kind()
    }
}

/// Running count of events per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCounts(BTreeMap<EventKind, u32>);

impl EventCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: EventKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, kind: EventKind) {
        *self.0.entry(kind).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.0.values().map(|&v| v as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventKind, u32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(EventKind, u32)> for EventCounts {
    fn from_iter<I: IntoIterator<Item = (EventKind, u32)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (kind, n) in iter {
            *counts.0.entry(kind).or_insert(0) += n;
        }
        counts
    }
}
