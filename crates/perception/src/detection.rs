//! Object detections from the object model

use serde::{Deserialize, Serialize};

use crate::geometry::{BoxEncoding, FaceBox};
use crate::PerceptionError;

/// Object detection as emitted by the object model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Model class label (e.g. "cell phone")
    #[serde(alias = "class")]
    pub label: String,
    /// Detection confidence
    pub score: f32,
    /// Box in producer encoding
    #[serde(alias = "box")]
    pub bbox: BoxEncoding,
}

/// Validated detection with a canonical box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetection {
    pub label: String,
    /// Confidence in 0..=1
    pub score: f32,
    pub bbox: FaceBox,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, score: f32, bbox: impl Into<BoxEncoding>) -> Self {
        Self {
            label: label.into(),
            score,
            bbox: bbox.into(),
        }
    }

    /// Validate score and box
    pub fn normalize(&self) -> Result<ObjectDetection, PerceptionError> {
        if !self.score.is_finite() || !(0.0..=1.0).contains(&self.score) {
            return Err(PerceptionError::InvalidScore(self.score));
        }
        Ok(ObjectDetection {
            label: self.label.clone(),
            score: self.score,
            bbox: self.bbox.normalize()?,
        })
    }
}
