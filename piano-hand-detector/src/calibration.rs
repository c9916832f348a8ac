//! Skin-color calibration from a fixed region of interest.
//!
//! The user holds a hand inside a box in the middle of the frame while a
//! countdown runs. Every pixel of the box is sampled on every frame, and the
//! 5th/95th percentiles of each HSV channel, padded, become the new range.

use crate::frame::{FrameView, Roi};
use piano_shared::{Hsv, HsvRange, MAX_HUE};

/// Frame rate the countdown is expressed in
pub const CALIBRATION_FPS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConfig {
    pub roi_width: usize,
    pub roi_height: usize,
    /// Number of frames to sample before computing the range
    pub duration_frames: u32,
    pub low_percentile: f32,
    pub high_percentile: f32,
    pub hue_padding: f32,
    pub saturation_padding: f32,
    pub value_padding: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            roi_width: 200,
            roi_height: 200,
            duration_frames: 5 * CALIBRATION_FPS,
            low_percentile: 5.0,
            high_percentile: 95.0,
            hue_padding: 5.0,
            saturation_padding: 40.0,
            value_padding: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// Still sampling
    Collecting { seconds_left: u32 },
    /// New skin range computed from the samples
    Complete(HsvRange),
    /// Countdown ended without a single sample
    Failed,
}

impl CalibrationStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, CalibrationStatus::Collecting { .. })
    }
}

/// Per-channel value counts, enough to answer percentile queries
#[derive(Debug, Clone)]
struct ChannelHistogram {
    counts: [u64; 256],
    total: u64,
}

impl ChannelHistogram {
    fn new() -> Self {
        Self {
            counts: [0; 256],
            total: 0,
        }
    }

    fn add(&mut self, value: u8) {
        self.counts[value as usize] += 1;
        self.total += 1;
    }

    /// Value at sorted position `rank` (0-based)
    fn value_at(&self, rank: u64) -> f64 {
        let mut seen = 0u64;
        for (value, &count) in self.counts.iter().enumerate() {
            seen += count;
            if seen > rank {
                return value as f64;
            }
        }
        255.0
    }

    /// Percentile with linear interpolation between neighbouring ranks.
    /// Ranks run into the millions, so positions are kept in f64.
    fn percentile(&self, p: f32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let position = (f64::from(p) / 100.0) * (self.total - 1) as f64;
        let lower = libm::floor(position);
        let fraction = position - lower;
        let lower_value = self.value_at(lower as u64);
        if fraction == 0.0 {
            return lower_value;
        }
        let upper_value = self.value_at(lower as u64 + 1);
        lower_value + (upper_value - lower_value) * fraction
    }
}

/// One calibration run; feed it frames until it reports a finished status
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    roi: Roi,
    remaining: u32,
    hue: ChannelHistogram,
    saturation: ChannelHistogram,
    value: ChannelHistogram,
    outcome: Option<CalibrationStatus>,
}

impl CalibrationSession {
    pub fn new(config: CalibrationConfig, frame_width: usize, frame_height: usize) -> Self {
        let roi = Roi::centered(config.roi_width, config.roi_height, frame_width, frame_height);
        Self {
            roi,
            remaining: config.duration_frames,
            config,
            hue: ChannelHistogram::new(),
            saturation: ChannelHistogram::new(),
            value: ChannelHistogram::new(),
            outcome: None,
        }
    }

    /// Box the hand has to be held in
    pub fn roi(&self) -> Roi {
        self.roi
    }

    pub fn seconds_left(&self) -> u32 {
        self.remaining / CALIBRATION_FPS + 1
    }

    pub fn sample_count(&self) -> u64 {
        self.hue.total
    }

    pub fn process(&mut self, frame: &FrameView<'_>) -> CalibrationStatus {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        let roi = self.roi.clamp_to(frame.width(), frame.height());
        if !roi.is_empty() {
            for y in roi.y..roi.y + roi.height {
                for x in roi.x..roi.x + roi.width {
                    let hsv = frame.hsv(x, y);
                    self.hue.add(hsv.h);
                    self.saturation.add(hsv.s);
                    self.value.add(hsv.v);
                }
            }
        }

        let seconds_left = self.seconds_left();
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return self.finish();
        }

        CalibrationStatus::Collecting { seconds_left }
    }

    /// Stop sampling and compute the range from what has been collected
    pub fn finish(&mut self) -> CalibrationStatus {
        if let Some(outcome) = self.outcome {
            return outcome;
        }

        let outcome = match self.compute_range() {
            Some(range) => CalibrationStatus::Complete(range),
            None => CalibrationStatus::Failed,
        };
        self.remaining = 0;
        self.outcome = Some(outcome);
        outcome
    }

    fn compute_range(&self) -> Option<HsvRange> {
        if self.hue.total == 0 {
            return None;
        }

        let c = &self.config;
        let bounds = |hist: &ChannelHistogram, padding: f32, max: f64| -> (u8, u8) {
            let padding = f64::from(padding);
            let low = (hist.percentile(c.low_percentile) - padding).max(0.0);
            let high = (hist.percentile(c.high_percentile) + padding).min(max);
            (low as u8, high as u8)
        };

        let (h_min, h_max) = bounds(&self.hue, c.hue_padding, f64::from(MAX_HUE));
        let (s_min, s_max) = bounds(&self.saturation, c.saturation_padding, 255.0);
        let (v_min, v_max) = bounds(&self.value, c.value_padding, 255.0);

        Some(HsvRange::new(
            Hsv::new(h_min, s_min, v_min),
            Hsv::new(h_max, s_max, v_max),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn uniform_frame(width: usize, height: usize, rgb: [u8; 3]) -> Vec<u8> {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        data
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut hist = ChannelHistogram::new();
        for v in [10u8, 20, 30, 40, 50] {
            hist.add(v);
        }
        assert_eq!(hist.percentile(0.0), 10.0);
        assert_eq!(hist.percentile(50.0), 30.0);
        assert_eq!(hist.percentile(100.0), 50.0);
        // rank 0.2 between 10 and 20
        assert!((hist.percentile(5.0) - 12.0).abs() < 1e-4);
        assert!((hist.percentile(95.0) - 48.0).abs() < 1e-4);
    }

    #[test]
    fn test_percentile_at_full_sample_count() {
        // 150 frames of a 200x200 box: 5% of the samples at 10, the rest at 60
        let mut hist = ChannelHistogram::new();
        hist.counts[10] = 300_000;
        hist.counts[60] = 5_700_000;
        hist.total = 6_000_000;

        // Position 299999.95 sits between the last 10 and the first 60
        assert!((hist.percentile(5.0) - 57.5).abs() < 1e-6);
        assert_eq!(hist.percentile(95.0), 60.0);
    }

    #[test]
    fn test_full_length_calibration_keeps_rank_precision() {
        let mut data = uniform_frame(200, 200, [0, 255, 0]);
        // First ten rows (2000 of 40000 pixels) are orange, H 10
        for pixel in data[..200 * 10 * 3].chunks_mut(3) {
            pixel.copy_from_slice(&[255, 85, 0]);
        }
        let frame = FrameView::rgb(200, 200, &data).unwrap();
        let mut session = CalibrationSession::new(CalibrationConfig::default(), 200, 200);

        let mut status = session.process(&frame);
        while !status.is_finished() {
            status = session.process(&frame);
        }
        assert_eq!(session.sample_count(), 150 * 200 * 200);
        // Hue: 57.5 - 5 and 60 + 5; S and V are 255 everywhere
        assert_eq!(
            status,
            CalibrationStatus::Complete(HsvRange::new(
                Hsv::new(52, 215, 215),
                Hsv::new(65, 255, 255)
            ))
        );
    }

    #[test]
    fn test_countdown_and_uniform_skin() {
        let config = CalibrationConfig {
            duration_frames: 3,
            ..CalibrationConfig::default()
        };
        let data = uniform_frame(320, 240, [180, 150, 120]);
        let frame = FrameView::rgb(320, 240, &data).unwrap();
        let mut session = CalibrationSession::new(config, 320, 240);
        assert_eq!(session.roi(), Roi::new(60, 20, 200, 200));

        assert_eq!(
            session.process(&frame),
            CalibrationStatus::Collecting { seconds_left: 1 }
        );
        assert_eq!(
            session.process(&frame),
            CalibrationStatus::Collecting { seconds_left: 1 }
        );
        let status = session.process(&frame);
        // Skin tone is H 15, S 85, V 180
        assert_eq!(
            status,
            CalibrationStatus::Complete(HsvRange::new(
                Hsv::new(10, 45, 140),
                Hsv::new(20, 125, 220)
            ))
        );
        assert_eq!(session.sample_count(), 3 * 200 * 200);

        // Further frames repeat the outcome without sampling
        assert_eq!(session.process(&frame), status);
        assert_eq!(session.sample_count(), 3 * 200 * 200);
    }

    #[test]
    fn test_padding_saturates_at_channel_limits() {
        let config = CalibrationConfig {
            duration_frames: 1,
            ..CalibrationConfig::default()
        };
        // Pure red: H 0, S 255, V 255
        let data = uniform_frame(10, 10, [255, 0, 0]);
        let frame = FrameView::rgb(10, 10, &data).unwrap();
        let mut session = CalibrationSession::new(config, 10, 10);
        assert_eq!(session.roi(), Roi::new(0, 0, 10, 10));
        assert_eq!(
            session.process(&frame),
            CalibrationStatus::Complete(HsvRange::new(
                Hsv::new(0, 215, 215),
                Hsv::new(5, 255, 255)
            ))
        );
    }

    #[test]
    fn test_seconds_left_counts_down() {
        let config = CalibrationConfig::default();
        let data = vec![0u8; 4 * 4 * 3];
        let frame = FrameView::rgb(4, 4, &data).unwrap();
        let mut session = CalibrationSession::new(config, 4, 4);
        assert_eq!(session.seconds_left(), 6);
        assert_eq!(
            session.process(&frame),
            CalibrationStatus::Collecting { seconds_left: 6 }
        );
        assert_eq!(session.seconds_left(), 5);
        for _ in 0..148 {
            assert!(!session.process(&frame).is_finished());
        }
        assert!(session.process(&frame).is_finished());
    }

    #[test]
    fn test_finish_without_samples_fails() {
        let mut session = CalibrationSession::new(CalibrationConfig::default(), 640, 480);
        assert_eq!(session.finish(), CalibrationStatus::Failed);
        assert_eq!(session.seconds_left(), 1);
    }
}
