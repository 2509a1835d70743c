//! Bright-region heuristic for paper/note rescue

use perception::{FaceBox, PixelRect, VideoFrame};

use crate::config::IntegrityConfig;

/// Classifies a frame region as paper-like when most of it is very bright
#[derive(Debug, Clone, Copy)]
pub struct RegionHeuristic {
    luminance_threshold: f32,
    bright_fraction_threshold: f32,
    max_samples: u32,
}

impl RegionHeuristic {
    pub fn new(config: &IntegrityConfig) -> Self {
        Self {
            luminance_threshold: config.luminance_threshold,
            bright_fraction_threshold: config.bright_fraction_threshold,
            max_samples: config.max_luminance_samples.max(1),
        }
    }

    /// True when the clamped region is predominantly bright
    pub fn is_paper_like(&self, frame: &VideoFrame, region: &FaceBox) -> bool {
        self.bright_fraction(frame, region)
            .is_some_and(|fraction| fraction > self.bright_fraction_threshold)
    }

    /// Fraction of sampled pixels above the luminance threshold
    ///
    /// `None` when the region has no visible area.
    pub fn bright_fraction(&self, frame: &VideoFrame, region: &FaceBox) -> Option<f32> {
        let rect = region.clamp_to(frame.width(), frame.height())?;
        let stride = self.stride(&rect);

        let mut sampled = 0u32;
        let mut bright = 0u32;
        for y in (rect.y..rect.y + rect.height).step_by(stride as usize) {
            for x in (rect.x..rect.x + rect.width).step_by(stride as usize) {
                if let Some(lum) = frame.luminance_at(x, y) {
                    sampled += 1;
                    if lum > self.luminance_threshold {
                        bright += 1;
                    }
                }
            }
        }

        if sampled == 0 {
            return None;
        }
        Some(bright as f32 / sampled as f32)
    }

    /// Smallest square stride keeping the sample grid within the cap
    fn stride(&self, rect: &PixelRect) -> u32 {
        let cap = self.max_samples as u64;
        let mut stride = ((rect.area() as f64 / cap as f64).sqrt().ceil() as u32).max(1);
        while samples_per_axis(rect.width, stride) * samples_per_axis(rect.height, stride) > cap {
            stride += 1;
        }
        stride
    }
}

fn samples_per_axis(len: u32, stride: u32) -> u64 {
    len.div_ceil(stride) as u64
}
