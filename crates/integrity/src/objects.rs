//! Object flagging with per-reason debounce

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};
use perception::{ObjectDetection, RawDetection, VideoFrame};
use tracing::{debug, warn};

use crate::config::IntegrityConfig;
use crate::event::EventDetail;
use crate::heuristic::RegionHeuristic;

/// Reason attached to detections rescued by the bright-region heuristic
pub const HEURISTIC_REASON: &str = "paper/note (heuristic)";

/// Converts object detections into debounced `object_detected` events
#[derive(Debug, Clone)]
pub struct ObjectDebouncer {
    /// Last emission instant by reason
    last_emitted: HashMap<String, DateTime<Utc>>,
    window: TimeDelta,
    confidence_min: f32,
    rescue_min: f32,
    flaggable: HashSet<String>,
    heuristic: RegionHeuristic,
}

impl ObjectDebouncer {
    pub fn new(config: &IntegrityConfig) -> Self {
        Self {
            last_emitted: HashMap::new(),
            window: TimeDelta::milliseconds(config.debounce_window_ms.min(i64::MAX as u64) as i64),
            confidence_min: config.object_confidence_min,
            rescue_min: config.rescue_confidence_min,
            flaggable: config
                .flaggable_labels
                .iter()
                .map(|l| l.to_lowercase())
                .collect(),
            heuristic: RegionHeuristic::new(config),
        }
    }

    /// Reason a detection is flagged for, if any
    ///
    /// The heuristic needs pixels; without a frame only label matches flag.
    pub fn classify(&self, detection: &ObjectDetection, frame: Option<&VideoFrame>) -> Option<String> {
        let label = detection.label.to_lowercase();
        if self.flaggable.contains(&label) && detection.score >= self.confidence_min {
            return Some(label);
        }
        if detection.score >= self.rescue_min {
            if let Some(frame) = frame {
                if self.heuristic.is_paper_like(frame, &detection.bbox) {
                    return Some(HEURISTIC_REASON.to_string());
                }
            }
        }
        None
    }

    /// Whether `reason` is outside its debounce window at `now`
    pub fn should_emit(&self, reason: &str, now: DateTime<Utc>) -> bool {
        match self.last_emitted.get(reason) {
            Some(last) => now - *last > self.window,
            None => true,
        }
    }

    /// Record an emission for `reason`
    pub fn record_emit(&mut self, reason: &str, now: DateTime<Utc>) {
        self.last_emitted.insert(reason.to_string(), now);
    }

    pub fn last_emitted(&self, reason: &str) -> Option<DateTime<Utc>> {
        self.last_emitted.get(reason).copied()
    }

    /// Process one tick's detections; bad entries are skipped individually
    pub fn observe(
        &mut self,
        detections: &[RawDetection],
        frame: Option<&VideoFrame>,
        now: DateTime<Utc>,
    ) -> Vec<EventDetail> {
        let mut events = Vec::new();

        for raw in detections {
            let detection = match raw.normalize() {
                Ok(d) => d,
                Err(e) => {
                    warn!("Skipping object detection '{}': {}", raw.label, e);
                    metrics::counter!("integrity_detections_skipped_total", "source" => "object")
                        .increment(1);
                    continue;
                }
            };

            let Some(reason) = self.classify(&detection, frame) else {
                continue;
            };

            if !self.should_emit(&reason, now) {
                debug!("Object '{}' suppressed: in debounce window", reason);
                continue;
            }

            self.record_emit(&reason, now);
            events.push(EventDetail::ObjectDetected {
                object: reason,
                model_class: detection.label,
                score: detection.score,
                bbox: detection.bbox,
            });
        }

        events
    }
}
