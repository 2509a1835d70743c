//! JSON-lines replay of recorded perception output
//!
//! Each line is one frame:
//! `{"t_ms": 500, "width": 640, "height": 480, "faces": [...], "objects": [...], "image": "f.png"}`.
//! `faces` accepts every box encoding the face model may produce; `image`
//! is optional and resolved relative to the replay file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use perception::{BoxEncoding, FrameSource, PerceptionError, RawDetection, Scripted, VideoFrame};
use serde::Deserialize;
use tracing::{debug, warn};

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFrame {
    /// Offset from session start (milliseconds)
    pub t_ms: i64,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub faces: Vec<BoxEncoding>,
    /// Kept raw so one bad entry does not drop the frame
    #[serde(default)]
    pub objects: Vec<serde_json::Value>,
    #[serde(default)]
    pub image: Option<PathBuf>,
}

/// Parsed replay file
#[derive(Debug, Clone, Default)]
pub struct ReplayFile {
    frames: Vec<ReplayFrame>,
    base_dir: Option<PathBuf>,
}

impl ReplayFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        let mut replay = Self::parse(&text);
        replay.base_dir = path.parent().map(Path::to_path_buf);
        Ok(replay)
    }

    /// Unparseable lines are skipped with a warning
    pub fn parse(text: &str) -> Self {
        let mut frames = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ReplayFrame>(line) {
                Ok(frame) => frames.push(frame),
                Err(e) => warn!("Skipping replay line {}: {}", index + 1, e),
            }
        }
        debug!("Parsed {} replay frames", frames.len());
        Self {
            frames,
            base_dir: None,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Face model answering each frame with its recorded boxes
    pub fn face_model(&self) -> Scripted<BoxEncoding> {
        let mut model = Scripted::new();
        for (seq, frame) in self.frames.iter().enumerate() {
            model.insert(seq as u64, frame.faces.clone());
        }
        model
    }

    /// Object model answering each frame with its recorded detections
    pub fn object_model(&self) -> Scripted<RawDetection> {
        let mut model = Scripted::new();
        for (seq, frame) in self.frames.iter().enumerate() {
            let detections = frame
                .objects
                .iter()
                .filter_map(|raw| match serde_json::from_value::<RawDetection>(raw.clone()) {
                    Ok(detection) => Some(detection),
                    Err(e) => {
                        warn!("Skipping object entry in frame {}: {}", seq, e);
                        None
                    }
                })
                .collect();
            model.insert(seq as u64, detections);
        }
        model
    }

    /// Frames stamped relative to `base`
    pub fn source(&self, base: DateTime<Utc>) -> ReplaySource {
        ReplaySource {
            frames: self.frames.clone(),
            base_dir: self.base_dir.clone(),
            base,
            next: 0,
        }
    }
}

/// Frame source over a replay file
#[derive(Debug)]
pub struct ReplaySource {
    frames: Vec<ReplayFrame>,
    base_dir: Option<PathBuf>,
    base: DateTime<Utc>,
    next: usize,
}

impl ReplaySource {
    fn load_image(&self, path: &Path) -> Result<image::RgbImage, PerceptionError> {
        let resolved = match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        image::open(&resolved)
            .map(|img| img.to_rgb8())
            .map_err(|e| PerceptionError::ImageProcessing(format!("{}: {}", resolved.display(), e)))
    }
}

impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, PerceptionError> {
        let Some(frame) = self.frames.get(self.next) else {
            return Ok(None);
        };
        let sequence = self.next as u64;
        self.next += 1;

        let captured_at = self
            .base
            .checked_add_signed(TimeDelta::milliseconds(frame.t_ms))
            .ok_or_else(|| PerceptionError::ImageProcessing(format!("Frame time out of range: {}", frame.t_ms)))?;

        let video = match &frame.image {
            Some(path) => VideoFrame::new(self.load_image(path)?, captured_at, sequence),
            None => VideoFrame::blank(frame.width, frame.height, captured_at, sequence),
        };
        Ok(Some(video))
    }
}
