//! Integrity score

use crate::config::ScoreWeights;
use crate::event::{EventCounts, EventKind};

/// Maximum (clean session) score
pub const MAX_SCORE: u8 = 100;

/// `clamp(100 - Σ weight·count, 0, 100)`
///
/// Every occurrence costs the same; there is no decay over time.
pub fn integrity_score(counts: &EventCounts, weights: &ScoreWeights) -> u8 {
    let penalty = [
        (EventKind::LookingAway, weights.looking_away),
        (EventKind::NoFace, weights.no_face),
        (EventKind::MultipleFaces, weights.multiple_faces),
        (EventKind::ObjectDetected, weights.object_detected),
    ]
    .iter()
    .fold(0u64, |acc, &(kind, weight)| {
        acc.saturating_add(counts.get(kind) as u64 * weight as u64)
    });

    MAX_SCORE.saturating_sub(penalty.min(MAX_SCORE as u64) as u8)
}
