//! Borrowed views over raw camera frames.

use crate::color::Rgb;
use crate::error::{DetectError, Result};
use piano_shared::Hsv;

/// Byte layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    /// OpenCV native order
    Bgr,
    /// Browser canvas order, alpha ignored
    Rgba,
}

impl PixelFormat {
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Validated, row-major view of one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn new(width: usize, height: usize, format: PixelFormat, data: &'a [u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(DetectError::EmptyFrame { width, height });
        }

        // A size that overflows can never be backed by a buffer
        let expected = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(format.channels()))
            .unwrap_or(usize::MAX);
        if data.len() < expected {
            return Err(DetectError::BufferTooSmall {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn rgb(width: usize, height: usize, data: &'a [u8]) -> Result<Self> {
        Self::new(width, height, PixelFormat::Rgb, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Pixel at (x, y); callers keep coordinates inside the frame
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let idx = (y * self.width + x) * self.format.channels();
        match self.format {
            PixelFormat::Rgb | PixelFormat::Rgba => {
                Rgb::new(self.data[idx], self.data[idx + 1], self.data[idx + 2])
            }
            PixelFormat::Bgr => Rgb::new(self.data[idx + 2], self.data[idx + 1], self.data[idx]),
        }
    }

    pub fn hsv(&self, x: usize, y: usize) -> Hsv {
        self.pixel(x, y).to_hsv()
    }
}

/// Rectangular region of interest in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region of the given size centred in a frame; shrinks when the frame is smaller
    pub fn centered(width: usize, height: usize, frame_width: usize, frame_height: usize) -> Self {
        let x = frame_width.saturating_sub(width) / 2;
        let y = frame_height.saturating_sub(height) / 2;
        Self::new(x, y, width, height).clamp_to(frame_width, frame_height)
    }

    /// Keep the origin inside the frame and cut the size at the frame edge
    pub fn clamp_to(&self, frame_width: usize, frame_height: usize) -> Self {
        let x = self.x.min(frame_width.saturating_sub(1));
        let y = self.y.min(frame_height.saturating_sub(1));
        Self {
            x,
            y,
            width: self.width.min(frame_width.saturating_sub(x)),
            height: self.height.min(frame_height.saturating_sub(y)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_frame_validation() {
        let data = vec![0u8; 4 * 3 * 3];
        assert!(FrameView::rgb(4, 3, &data).is_ok());
        assert_eq!(
            FrameView::rgb(0, 3, &data).unwrap_err(),
            DetectError::EmptyFrame {
                width: 0,
                height: 3
            }
        );
        assert_eq!(
            FrameView::new(4, 3, PixelFormat::Rgba, &data).unwrap_err(),
            DetectError::BufferTooSmall {
                expected: 48,
                actual: 36
            }
        );
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        assert_eq!(
            FrameView::rgb(usize::MAX / 2, 3, &[]).unwrap_err(),
            DetectError::BufferTooSmall {
                expected: usize::MAX,
                actual: 0
            }
        );
        // Pixel count fits, byte count does not
        let data = vec![0u8; 12];
        assert!(matches!(
            FrameView::new(usize::MAX / 4, 2, PixelFormat::Rgba, &data),
            Err(DetectError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_bgr_pixel_order() {
        let data = [10u8, 20, 30];
        let frame = FrameView::new(1, 1, PixelFormat::Bgr, &data).unwrap();
        assert_eq!(frame.pixel(0, 0), Rgb::new(30, 20, 10));

        let frame = FrameView::rgb(1, 1, &data).unwrap();
        assert_eq!(frame.pixel(0, 0), Rgb::new(10, 20, 30));
    }

    #[test]
    fn test_roi_clamp() {
        let roi = Roi::new(600, 400, 200, 200).clamp_to(640, 480);
        assert_eq!(roi, Roi::new(600, 400, 40, 80));

        let outside = Roi::new(900, 900, 200, 200).clamp_to(640, 480);
        assert_eq!(outside, Roi::new(639, 479, 1, 1));
    }

    #[test]
    fn test_roi_centered() {
        assert_eq!(Roi::centered(200, 200, 640, 480), Roi::new(220, 140, 200, 200));
        assert_eq!(Roi::centered(200, 200, 100, 50), Roi::new(0, 0, 100, 50));
    }
}
