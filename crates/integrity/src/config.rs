//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::IntegrityError;

/// Per-kind penalty applied by the integrity scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub looking_away: u32,
    pub no_face: u32,
    pub multiple_faces: u32,
    pub object_detected: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            looking_away: 6,
            no_face: 12,
            multiple_faces: 20,
            object_detected: 3,
        }
    }
}

/// Integrity engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// Continuous face absence before a `no_face` event (milliseconds)
    pub no_face_threshold_ms: u64,

    /// Continuous gaze deviation before a `looking_away` event (milliseconds)
    pub looking_away_threshold_ms: u64,

    /// Post-fire cooldown pushed onto a condition timer (milliseconds)
    pub hysteresis_cooldown_ms: u64,

    /// Face-center distance from frame center, as a fraction of frame width
    pub gaze_deviation_ratio: f32,

    /// Minimum score for a flaggable label to raise an event
    pub object_confidence_min: f32,

    /// Minimum score for the region heuristic to be consulted
    pub rescue_confidence_min: f32,

    /// Minimum time between two events sharing a reason (milliseconds)
    pub debounce_window_ms: u64,

    /// Object labels that are flagged (case-insensitive)
    pub flaggable_labels: Vec<String>,

    /// Luminance above which a sampled pixel counts as bright (0-1)
    pub luminance_threshold: f32,

    /// Fraction of bright samples above which a region is paper-like
    pub bright_fraction_threshold: f32,

    /// Upper bound on pixels sampled per region
    pub max_luminance_samples: u32,

    /// Capacity of the most-recent event buffer
    pub recent_event_capacity: usize,

    /// Events carried in the final report
    pub report_event_limit: usize,

    /// Run the object model every N ticks
    pub object_every_n_ticks: u64,

    /// Scorer weights
    pub weights: ScoreWeights,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            no_face_threshold_ms: 10_000,
            looking_away_threshold_ms: 5_000,
            hysteresis_cooldown_ms: 1_000,
            gaze_deviation_ratio: 0.18,
            object_confidence_min: 0.45,
            rescue_confidence_min: 0.25,
            debounce_window_ms: 5_000,
            flaggable_labels: [
                "cell phone",
                "phone",
                "mobile phone",
                "laptop",
                "book",
                "remote",
                "keyboard",
                "mouse",
                "tv",
                "tvmonitor",
                "monitor",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            luminance_threshold: 0.85,
            bright_fraction_threshold: 0.30,
            max_luminance_samples: 2_000,
            recent_event_capacity: 1_000,
            report_event_limit: 200,
            object_every_n_ticks: 2,
            weights: ScoreWeights::default(),
        }
    }
}

impl IntegrityConfig {
    /// Create strict config (shorter thresholds, tighter gaze cone)
    pub fn strict() -> Self {
        Self {
            no_face_threshold_ms: 5_000,
            looking_away_threshold_ms: 3_000,
            gaze_deviation_ratio: 0.12,
            object_confidence_min: 0.35,
            ..Default::default()
        }
    }

    /// Create lenient config (longer thresholds, wider gaze cone)
    pub fn lenient() -> Self {
        Self {
            no_face_threshold_ms: 20_000,
            looking_away_threshold_ms: 10_000,
            gaze_deviation_ratio: 0.25,
            object_confidence_min: 0.6,
            ..Default::default()
        }
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let windows = [
            ("no_face_threshold_ms", self.no_face_threshold_ms),
            ("looking_away_threshold_ms", self.looking_away_threshold_ms),
            ("debounce_window_ms", self.debounce_window_ms),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(IntegrityError::Config(format!("{} must be positive", name)));
            }
        }

        let ratios = [
            ("gaze_deviation_ratio", self.gaze_deviation_ratio),
            ("object_confidence_min", self.object_confidence_min),
            ("rescue_confidence_min", self.rescue_confidence_min),
            ("luminance_threshold", self.luminance_threshold),
            ("bright_fraction_threshold", self.bright_fraction_threshold),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(IntegrityError::Config(format!(
                    "{} must be within 0..=1, got {}",
                    name, value
                )));
            }
        }

        if self.rescue_confidence_min > self.object_confidence_min {
            return Err(IntegrityError::Config(
                "rescue_confidence_min exceeds object_confidence_min".into(),
            ));
        }
        if self.max_luminance_samples == 0
            || self.recent_event_capacity == 0
            || self.object_every_n_ticks == 0
        {
            return Err(IntegrityError::Config(
                "sample cap, event capacity and object cadence must be positive".into(),
            ));
        }
        Ok(())
    }
}
