//! Face/object model and frame source contracts

use std::collections::HashMap;

use crate::detection::RawDetection;
use crate::frame::VideoFrame;
use crate::geometry::BoxEncoding;
use crate::PerceptionError;

/// Face detector (BlazeFace or similar), invoked once per tick
#[allow(async_fn_in_trait)]
pub trait FaceModel {
    /// Detect faces; boxes are returned in the producer's own encoding
    async fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<BoxEncoding>, PerceptionError>;
}

/// Object detector (COCO-SSD or similar), invoked at reduced cadence
#[allow(async_fn_in_trait)]
pub trait ObjectModel {
    async fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<RawDetection>, PerceptionError>;
}

/// Source of frames; `None` once the stream has ended
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, PerceptionError>;
}

/// Model that replays precomputed outputs keyed by frame sequence number
///
/// Frames with no scripted entry produce an empty detection list.
#[derive(Debug)]
pub struct Scripted<T> {
    outputs: HashMap<u64, Result<Vec<T>, PerceptionError>>,
    calls: usize,
}

impl<T> Default for Scripted<T> {
    fn default() -> Self {
        Self {
            outputs: HashMap::new(),
            calls: 0,
        }
    }
}

impl<T> Scripted<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the detections returned for a frame
    pub fn insert(&mut self, sequence: u64, detections: Vec<T>) {
        self.outputs.insert(sequence, Ok(detections));
    }

    /// Script an inference failure for a frame
    pub fn fail(&mut self, sequence: u64, reason: impl Into<String>) {
        self.outputs
            .insert(sequence, Err(PerceptionError::Inference(reason.into())));
    }

    /// Number of times the model was invoked
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn take(&mut self, frame: &VideoFrame) -> Result<Vec<T>, PerceptionError> {
        self.calls += 1;
        self.outputs
            .remove(&frame.sequence())
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl FaceModel for Scripted<BoxEncoding> {
    async fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<BoxEncoding>, PerceptionError> {
        self.take(frame)
    }
}

impl ObjectModel for Scripted<RawDetection> {
    async fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<RawDetection>, PerceptionError> {
        self.take(frame)
    }
}
