//! Box geometry and normalization of detector box encodings

use serde::{Deserialize, Serialize};

use crate::PerceptionError;

/// Axis-aligned rectangle in frame-pixel coordinates (`w > 0`, `h > 0`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Integer pixel rectangle, already clamped to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl FaceBox {
    /// Validated constructor; rejects non-finite values and empty boxes
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Result<Self, PerceptionError> {
        if ![x, y, w, h].iter().all(|v| v.is_finite()) {
            return Err(PerceptionError::MalformedBox(format!(
                "non-finite coordinates ({}, {}, {}, {})",
                x, y, w, h
            )));
        }
        if w <= 0.0 || h <= 0.0 {
            return Err(PerceptionError::MalformedBox(format!(
                "empty box {}x{}",
                w, h
            )));
        }
        Ok(Self { x, y, w, h })
    }

    /// Center point (x, y)
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Clamp to the visible frame; `None` when nothing of the box is visible
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        let x0 = self.x.max(0.0).floor();
        let y0 = self.y.max(0.0).floor();
        let x1 = (self.x + self.w).min(frame_width as f32).ceil();
        let y1 = (self.y + self.h).min(frame_height as f32).ceil();

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let rect = PixelRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        };
        // x0 may sit exactly on the right/bottom edge
        if rect.x >= frame_width || rect.y >= frame_height || rect.area() == 0 {
            return None;
        }
        Some(rect)
    }
}

/// Box encodings emitted by the supported detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoxEncoding {
    /// `{x, y, width, height}`
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// `{x, y, w, h}`
    Xywh { x: f32, y: f32, w: f32, h: f32 },
    /// `{top_left: [x, y], bottom_right: [x, y]}`
    Corners {
        #[serde(alias = "topLeft")]
        top_left: [f32; 2],
        #[serde(alias = "bottomRight")]
        bottom_right: [f32; 2],
    },
    /// `{x_min, y_min, x_max, y_max}`
    MinMax {
        #[serde(alias = "xMin")]
        x_min: f32,
        #[serde(alias = "yMin")]
        y_min: f32,
        #[serde(alias = "xMax")]
        x_max: f32,
        #[serde(alias = "yMax")]
        y_max: f32,
    },
    /// `[x, y, w, h]`
    Array(Vec<f32>),
    /// Anything else the producer sent
    Unknown(serde_json::Value),
}

impl BoxEncoding {
    /// Normalize to the canonical `{x, y, w, h}` rectangle
    pub fn normalize(&self) -> Result<FaceBox, PerceptionError> {
        match self {
            BoxEncoding::Rect {
                x,
                y,
                width,
                height,
            } => FaceBox::new(*x, *y, *width, *height),
            BoxEncoding::Xywh { x, y, w, h } => FaceBox::new(*x, *y, *w, *h),
            BoxEncoding::Corners {
                top_left,
                bottom_right,
            } => FaceBox::new(
                top_left[0],
                top_left[1],
                bottom_right[0] - top_left[0],
                bottom_right[1] - top_left[1],
            ),
            BoxEncoding::MinMax {
                x_min,
                y_min,
                x_max,
                y_max,
            } => FaceBox::new(*x_min, *y_min, x_max - x_min, y_max - y_min),
            BoxEncoding::Array(values) => match values.as_slice() {
                [x, y, w, h] => FaceBox::new(*x, *y, *w, *h),
                _ => Err(PerceptionError::MalformedBox(format!(
                    "expected 4 values, got {}",
                    values.len()
                ))),
            },
            BoxEncoding::Unknown(value) => Err(PerceptionError::MalformedBox(format!(
                "unrecognized encoding: {}",
                value
            ))),
        }
    }
}

impl From<FaceBox> for BoxEncoding {
    fn from(b: FaceBox) -> Self {
        BoxEncoding::Xywh {
            x: b.x,
            y: b.y,
            w: b.w,
            h: b.h,
        }
    }
}
