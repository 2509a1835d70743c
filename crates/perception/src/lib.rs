//! Perception boundary for session monitoring
//!
//! Everything the integrity engine consumes from the outside world:
//! - Decoded RGB frames with their capture instant
//! - Face boxes in whichever encoding the detector emits, normalized once
//! - Raw object detections (label, score, box)
//! - Async face/object model contracts and a frame source contract

pub mod detection;
pub mod frame;
pub mod geometry;
pub mod model;

pub use detection::{ObjectDetection, RawDetection};
pub use frame::{luminance, VideoFrame};
pub use geometry::{BoxEncoding, FaceBox, PixelRect};
pub use model::{FaceModel, FrameSource, ObjectModel, Scripted};

use thiserror::Error;

/// Perception error types
#[derive(Error, Debug)]
pub enum PerceptionError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Malformed box: {0}")]
    MalformedBox(String),

    #[error("Invalid score: {0}")]
    InvalidScore(f32),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}
