//! Detector availability

use serde::{Deserialize, Serialize};

/// Which detectors are feeding the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    #[default]
    Full,
    /// Object model unavailable
    FaceOnly,
    /// Face model unavailable
    ObjectsOnly,
    /// No detector available; session and recording still proceed
    Disabled,
}

impl DetectionStatus {
    pub fn from_availability(face: bool, objects: bool) -> Self {
        match (face, objects) {
            (true, true) => DetectionStatus::Full,
            (true, false) => DetectionStatus::FaceOnly,
            (false, true) => DetectionStatus::ObjectsOnly,
            (false, false) => DetectionStatus::Disabled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Full => "full",
            DetectionStatus::FaceOnly => "face_only",
            DetectionStatus::ObjectsOnly => "objects_only",
            DetectionStatus::Disabled => "disabled",
        }
    }

    pub fn is_degraded(&self) -> bool {
        *self != DetectionStatus::Full
    }
}
