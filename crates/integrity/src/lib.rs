//! Session Integrity Engine
//!
//! Turns per-frame perception results into auditable session events:
//! - Face presence and gaze deviation with hysteresis timers
//! - Flagged objects with per-reason debounce and a bright-region rescue
//! - Per-kind counters, integrity score, and an immutable session report
//!
//! One [`IntegrityEngine`] owns the state of one session. [`SessionDriver`]
//! runs it as a single cooperative tick loop over a frame source.

pub mod config;
pub mod driver;
pub mod engine;
pub mod event;
pub mod heuristic;
pub mod objects;
pub mod presence;
pub mod report;
pub mod score;
pub mod session;
pub mod status;

pub use config::{IntegrityConfig, ScoreWeights};
pub use driver::{DiscardOutlet, EventOutlet, SessionDriver, StopHandle};
pub use engine::IntegrityEngine;
pub use event::{Event, EventCounts, EventDetail, EventKind};
pub use heuristic::RegionHeuristic;
pub use objects::{ObjectDebouncer, HEURISTIC_REASON};
pub use presence::{ConditionTimer, PresenceTracker, TimerState};
pub use report::{format_duration, Report};
pub use score::integrity_score;
pub use session::{RecentEvents, Session, SessionAggregator};
pub use status::DetectionStatus;

use thiserror::Error;

/// Integrity engine error types
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("A session is already active")]
    SessionActive,

    #[error("No active session")]
    SessionNotActive,

    #[error("Configuration error: {0}")]
    Config(String),
}
