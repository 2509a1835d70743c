//! Video frame types and pixel access

use chrono::{DateTime, Utc};
use image::{ImageBuffer, RgbImage};

use crate::PerceptionError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data
    image: RgbImage,
    /// Instant the frame was observed; drives every timer in the engine
    captured_at: DateTime<Utc>,
    /// Frame sequence number
    sequence: u64,
}

impl VideoFrame {
    /// Wrap an already decoded RGB image
    pub fn new(image: RgbImage, captured_at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            image,
            captured_at,
            sequence,
        }
    }

    /// Create a frame from raw RGB data (width * height * 3)
    pub fn from_raw(
        data: Vec<u8>,
        width: u32,
        height: u32,
        captured_at: DateTime<Utc>,
        sequence: u64,
    ) -> Result<Self, PerceptionError> {
        let len = data.len();
        let image = ImageBuffer::from_raw(width, height, data).ok_or_else(|| {
            PerceptionError::ImageProcessing(format!(
                "buffer of {} bytes does not fit {}x{} RGB",
                len, width, height
            ))
        })?;
        Ok(Self::new(image, captured_at, sequence))
    }

    /// Black frame of the given size, used when only detections are known
    pub fn blank(width: u32, height: u32, captured_at: DateTime<Utc>, sequence: u64) -> Self {
        Self::new(RgbImage::new(width, height), captured_at, sequence)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Relative luminance (0-1) of the pixel at (x, y)
    pub fn luminance_at(&self, x: u32, y: u32) -> Option<f32> {
        self.get_pixel(x, y).map(luminance)
    }
}

/// Perceptual luminance in 0..=1: 0.299*R + 0.587*G + 0.114*B
pub fn luminance(rgb: [u8; 3]) -> f32 {
    (rgb[0] as f32 * 0.299 + rgb[1] as f32 * 0.587 + rgb[2] as f32 * 0.114) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(0).unwrap()
    }

    #[test]
    fn test_luminance_extremes() {
        assert_eq!(luminance([0, 0, 0]), 0.0);
        assert!((luminance([255, 255, 255]) - 1.0).abs() < 1e-4);
        // Green dominates perceived brightness
        assert!(luminance([0, 255, 0]) > luminance([255, 0, 0]));
        assert!(luminance([255, 0, 0]) > luminance([0, 0, 255]));
    }

    #[test]
    fn test_from_raw_rejects_short_buffer() {
        let result = VideoFrame::from_raw(vec![0; 10], 4, 4, epoch(), 0);
        assert!(matches!(result, Err(PerceptionError::ImageProcessing(_))));
    }

    #[test]
    fn test_pixel_access() {
        let mut data = vec![0u8; 2 * 2 * 3];
        // pixel (1, 1) is white
        data[9..12].copy_from_slice(&[255, 255, 255]);
        let frame = VideoFrame::from_raw(data, 2, 2, epoch(), 7).unwrap();

        assert_eq!(frame.width(), 2);
        assert_eq!(frame.sequence(), 7);
        assert_eq!(frame.get_pixel(1, 1), Some([255, 255, 255]));
        assert_eq!(frame.get_pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(frame.get_pixel(2, 0), None);
        assert!(frame.luminance_at(1, 1).unwrap() > 0.99);
    }
}
