use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use piano_hand_detector::FrameView;
use std::path::Path;

/// Owned RGB frame handed from the capture thread to the session
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub width: usize,
    pub height: usize,
    pub rgb: Vec<u8>,
}

impl CapturedFrame {
    pub fn view(&self) -> piano_hand_detector::Result<FrameView<'_>> {
        FrameView::rgb(self.width, self.height, &self.rgb)
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            rgb: image.into_raw(),
        }
    }

    /// Mirror horizontally so the preview behaves like a mirror
    pub fn mirrored(&self) -> Self {
        if self.width == 0 {
            return self.clone();
        }
        let mut rgb = Vec::with_capacity(self.rgb.len());
        for row in self.rgb.chunks(self.width * 3) {
            for pixel in row.chunks(3).rev() {
                rgb.extend_from_slice(pixel);
            }
        }
        Self {
            width: self.width,
            height: self.height,
            rgb,
        }
    }
}

/// Load a still image, scaled to the frame size the zone is defined for
pub fn load_image(path: &Path, width: u32, height: u32, mirror: bool) -> Result<CapturedFrame> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .to_rgb8();
    log::debug!(
        "Loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );

    let image = if image.dimensions() != (width, height) {
        imageops::resize(&image, width, height, FilterType::Triangle)
    } else {
        image
    };

    let frame = CapturedFrame::from_image(image);
    Ok(if mirror { frame.mirrored() } else { frame })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_swaps_columns() {
        let frame = CapturedFrame {
            width: 2,
            height: 1,
            rgb: vec![1, 2, 3, 4, 5, 6],
        };
        assert_eq!(frame.mirrored().rgb, vec![4, 5, 6, 1, 2, 3]);
        assert_eq!(frame.mirrored().mirrored(), frame);
    }

    #[test]
    fn test_load_image_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbImage::from_pixel(32, 24, image::Rgb([180, 150, 120]))
            .save(&path)
            .unwrap();

        let frame = load_image(&path, 64, 48, false).unwrap();
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(&frame.rgb[..3], &[180, 150, 120]);
        assert!(frame.view().is_ok());
    }

    #[test]
    fn test_load_missing_image() {
        let err = load_image(Path::new("/nonexistent/frame.png"), 64, 48, false).unwrap_err();
        assert!(err.to_string().contains("Failed to open image"));
    }
}
