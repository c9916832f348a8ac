#![cfg_attr(not(feature = "std"), no_std)]

//! Hand detection library for the camera piano
//! Skin color segmentation followed by contour and convexity-defect analysis
//! to find fingertips. Pure Rust, usable without `std` (needs `alloc`).

extern crate alloc;

pub mod calibration;
pub mod color;
pub mod contour;
pub mod error;
pub mod frame;
pub mod hull;
pub mod mask;

use alloc::vec::Vec;
use piano_shared::{Fingertip, FingertipSource, HandReading, HsvRange, Position};

pub use calibration::{CalibrationConfig, CalibrationSession, CalibrationStatus};
pub use color::Rgb;
pub use contour::{Contour, Point};
pub use error::{DetectError, Result};
pub use frame::{FrameView, PixelFormat, Roi};
pub use mask::Mask;

/// Tuning knobs for the detection pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub skin_range: HsvRange,
    /// Dilate and erode iterations with a 3x3 kernel
    pub morph_iterations: usize,
    /// Sharpest valley angle still counted as a gap between fingers
    pub max_defect_angle: f32,
    /// Optional noise filter: shallower defects are skipped. 0 keeps every
    /// defect, as OpenCV's `convexityDefects` recipe does.
    pub min_defect_depth: f32,
    /// Optional noise filter: a largest blob below this area is not a hand.
    /// 0 accepts any blob.
    pub min_contour_area: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            skin_range: HsvRange::DEFAULT_SKIN,
            morph_iterations: 2,
            max_defect_angle: 90.0,
            min_defect_depth: 0.0,
            min_contour_area: 0.0,
        }
    }
}

/// Hand detector using skin color detection
#[derive(Debug, Clone)]
pub struct HandDetector {
    config: DetectorConfig,
}

impl HandDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn with_skin_range(mut self, range: HsvRange) -> Self {
        self.config.skin_range = range;
        self
    }

    pub fn with_min_contour_area(mut self, area: f32) -> Self {
        self.config.min_contour_area = area;
        self
    }

    pub fn with_min_defect_depth(mut self, depth: f32) -> Self {
        self.config.min_defect_depth = depth;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn skin_range(&self) -> HsvRange {
        self.config.skin_range
    }

    /// Replace the skin range, e.g. after calibration
    pub fn set_skin_range(&mut self, range: HsvRange) {
        self.config.skin_range = range;
    }

    /// Cleaned-up skin mask of a frame
    pub fn skin_mask(&self, frame: &FrameView<'_>) -> Mask {
        Mask::from_frame(frame, &self.config.skin_range).close(self.config.morph_iterations)
    }

    /// Process a frame and detect fingertips of the largest skin blob.
    /// Returns `Ok(None)` when no blob is large enough to be a hand.
    pub fn detect(&self, frame: &FrameView<'_>) -> Result<Option<HandReading>> {
        let mask = self.skin_mask(frame);
        let contours = contour::find_external_contours(&mask);

        let hand = match contour::largest(&contours) {
            Some(contour) => contour,
            None => return Ok(None),
        };
        let area = hand.area();
        if area < self.config.min_contour_area {
            return Ok(None);
        }

        let bounds = match hand.bounding_box() {
            Some(bounds) => bounds,
            None => return Ok(None),
        };

        Ok(Some(HandReading {
            fingertips: self.fingertips(hand),
            contour_area: area,
            bounds,
        }))
    }

    /// Fingertip candidates of a hand contour: end points of sharp valleys
    /// between fingers, plus the topmost point for a single raised finger.
    /// The topmost point is reported even when a valley already ended there.
    pub fn fingertips(&self, hand: &Contour) -> Vec<Fingertip> {
        let points = hand.points();
        let hull = hull::convex_hull_indices(points);
        let defects = hull::convexity_defects(points, &hull);

        let mut tips: Vec<Fingertip> = Vec::new();
        let mut push = |p: Point, source: FingertipSource| {
            tips.push(Fingertip::new(Position::new(p.x as f32, p.y as f32), source));
        };

        for defect in defects
            .iter()
            .filter(|d| d.depth >= self.config.min_defect_depth)
        {
            if let Some(angle) = defect.angle_degrees(points) {
                if angle <= self.config.max_defect_angle {
                    push(points[defect.end], FingertipSource::Defect);
                }
            }
        }

        if let Some(top) = hand.topmost() {
            push(top, FingertipSource::Topmost);
        }

        tips
    }
}

impl Default for HandDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const SKIN: [u8; 3] = [180, 150, 120];

    fn paint(data: &mut [u8], width: usize, x0: usize, y0: usize, w: usize, h: usize) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                let idx = (y * width + x) * 3;
                data[idx..idx + 3].copy_from_slice(&SKIN);
            }
        }
    }

    /// White 200x200 frame with a palm and three raised fingers of
    /// different lengths, tops at y 50, 30 and 40
    fn synthetic_hand() -> Vec<u8> {
        let mut data = vec![255u8; 200 * 200 * 3];
        paint(&mut data, 200, 60, 80, 80, 100);
        for (x, top) in [(70, 50), (100, 30), (120, 40)] {
            paint(&mut data, 200, x, top, 10, 80 - top);
        }
        data
    }

    #[test]
    fn test_hand_detector_no_skin() {
        let detector = HandDetector::new();

        // Create a 10x10 blue image
        let mut data = vec![0u8; 10 * 10 * 3];
        for i in 0..(10 * 10) {
            data[i * 3] = 50;
            data[i * 3 + 1] = 50;
            data[i * 3 + 2] = 200;
        }

        let frame = FrameView::rgb(10, 10, &data).unwrap();
        assert_eq!(detector.detect(&frame).unwrap(), None);
    }

    #[test]
    fn test_min_contour_area_filters_small_blobs() {
        let mut data = vec![255u8; 100 * 100 * 3];
        paint(&mut data, 100, 10, 10, 20, 20);
        let frame = FrameView::rgb(100, 100, &data).unwrap();

        // Any blob counts by default
        assert!(HandDetector::new().detect(&frame).unwrap().is_some());

        let strict = HandDetector::new().with_min_contour_area(1500.0);
        assert_eq!(strict.detect(&frame).unwrap(), None);
    }

    #[test]
    fn test_min_defect_depth_filters_shallow_valleys() {
        let data = synthetic_hand();
        let frame = FrameView::rgb(200, 200, &data).unwrap();

        // Both valleys are about 40 px deep
        let strict = HandDetector::new().with_min_defect_depth(50.0);
        let reading = strict.detect(&frame).unwrap().unwrap();
        assert_eq!(
            reading.fingertips,
            vec![Fingertip::new(Position::new(100.0, 30.0), FingertipSource::Topmost)]
        );
    }

    #[test]
    fn test_topmost_is_kept_when_a_valley_ends_there() {
        // Two fingers of equal height: the valley between them ends on the
        // left finger's top-left corner, which is also the topmost point
        let mut data = vec![255u8; 200 * 200 * 3];
        paint(&mut data, 200, 60, 80, 80, 100);
        paint(&mut data, 200, 80, 30, 10, 50);
        paint(&mut data, 200, 110, 30, 10, 50);
        let frame = FrameView::rgb(200, 200, &data).unwrap();

        let reading = HandDetector::new().detect(&frame).unwrap().unwrap();
        let at_corner: Vec<_> = reading
            .fingertips
            .iter()
            .filter(|t| t.position == Position::new(80.0, 30.0))
            .map(|t| t.source)
            .collect();
        assert_eq!(at_corner, vec![FingertipSource::Defect, FingertipSource::Topmost]);
    }

    #[test]
    fn test_hand_detector_finds_fingertips() {
        let detector = HandDetector::new();
        let data = synthetic_hand();
        let frame = FrameView::rgb(200, 200, &data).unwrap();

        let reading = detector
            .detect(&frame)
            .unwrap()
            .expect("Hand should be detected in synthetic image");

        let bounds = reading.bounds;
        assert_eq!((bounds.x, bounds.y, bounds.width, bounds.height), (60, 30, 80, 150));
        assert!(reading.contour_area > 8000.0);

        // Walking the outline counter-clockwise, each valley ends on the
        // finger to its left: the left finger and the right edge of the
        // middle one. The topmost point is the middle finger's left corner.
        assert_eq!(
            reading.fingertips,
            vec![
                Fingertip::new(Position::new(70.0, 50.0), FingertipSource::Defect),
                Fingertip::new(Position::new(109.0, 30.0), FingertipSource::Defect),
                Fingertip::new(Position::new(100.0, 30.0), FingertipSource::Topmost),
            ]
        );
    }

    #[test]
    fn test_single_finger_reports_topmost() {
        let detector = HandDetector::new();
        let mut data = vec![255u8; 200 * 200 * 3];
        paint(&mut data, 200, 60, 80, 80, 100);
        paint(&mut data, 200, 95, 30, 10, 50);
        let frame = FrameView::rgb(200, 200, &data).unwrap();

        let reading = detector.detect(&frame).unwrap().unwrap();
        let topmost = reading
            .fingertips
            .iter()
            .find(|t| t.source == FingertipSource::Topmost)
            .expect("topmost point is always reported");
        assert_eq!(topmost.position, Position::new(95.0, 30.0));
        for tip in &reading.fingertips {
            assert!(tip.position.y < 80.0, "tip on palm: {:?}", tip);
        }
    }

    #[test]
    fn test_fist_reports_only_topmost() {
        let detector = HandDetector::new();
        let mut data = vec![255u8; 120 * 120 * 3];
        paint(&mut data, 120, 20, 30, 70, 60);
        let frame = FrameView::rgb(120, 120, &data).unwrap();

        let reading = detector.detect(&frame).unwrap().unwrap();
        assert_eq!(reading.fingertips.len(), 1);
        assert_eq!(reading.fingertips[0].source, FingertipSource::Topmost);
        assert_eq!(reading.fingertips[0].position, Position::new(20.0, 30.0));
    }

    #[test]
    fn test_calibrated_range_changes_detection() {
        let mut detector = HandDetector::new();
        let data = synthetic_hand();
        let frame = FrameView::rgb(200, 200, &data).unwrap();
        assert!(detector.detect(&frame).unwrap().is_some());

        // A range that excludes the skin tone's hue
        let blue_only = HsvRange::new(
            piano_shared::Hsv::new(100, 50, 50),
            piano_shared::Hsv::new(130, 255, 255),
        );
        detector.set_skin_range(blue_only);
        assert_eq!(detector.skin_range(), blue_only);
        assert_eq!(detector.detect(&frame).unwrap(), None);
    }

    #[test]
    fn test_bgr_frame() {
        let detector = HandDetector::new();
        let rgb = synthetic_hand();
        let bgr: Vec<u8> = rgb.chunks(3).flat_map(|p| [p[2], p[1], p[0]]).collect();
        let frame = FrameView::new(200, 200, PixelFormat::Bgr, &bgr).unwrap();
        assert!(detector.detect(&frame).unwrap().is_some());
    }
}
