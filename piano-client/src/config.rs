use anyhow::{ensure, Context, Result};
use piano_core::{DetectionZone, Rect};
use piano_hand_detector::DetectorConfig;
use piano_shared::HsvRange;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Detection zone edges in camera pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneEdges {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl From<&DetectionZone> for ZoneEdges {
    fn from(zone: &DetectionZone) -> Self {
        Self {
            left: zone.left(),
            right: zone.right(),
            top: zone.top(),
            bottom: zone.bottom(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub morph_iterations: usize,
    pub max_defect_angle: f32,
    pub min_defect_depth: f32,
    pub min_contour_area: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        let config = DetectorConfig::default();
        Self {
            morph_iterations: config.morph_iterations,
            max_defect_angle: config.max_defect_angle,
            min_defect_depth: config.min_defect_depth,
            min_contour_area: config.min_contour_area,
        }
    }
}

/// Everything the client persists between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera_index: i32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub skin_range: HsvRange,
    /// `None` uses the default zone for the frame size
    pub zone: Option<ZoneEdges>,
    /// Width of the piano window; a narrower window than the piano scrolls
    pub canvas_width: f32,
    pub piano_slider: f32,
    /// Fingertips play only while the piano overlay is shown
    pub piano_overlay: bool,
    /// Home-row letters play only while the keyboard overlay is shown
    pub keyboard_overlay: bool,
    pub detector: DetectorSettings,
    pub press_frames: u32,
    pub release_frames: u32,
    pub velocity: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            frame_width: 640,
            frame_height: 480,
            skin_range: HsvRange::DEFAULT_SKIN,
            zone: None,
            canvas_width: 1600.0,
            piano_slider: 0.5,
            piano_overlay: true,
            keyboard_overlay: false,
            detector: DetectorSettings::default(),
            press_frames: 2,
            release_frames: 3,
            velocity: 100,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.frame_width > 0 && self.frame_height > 0,
            "frame size must be positive, got {}x{}",
            self.frame_width,
            self.frame_height
        );
        ensure!(
            self.skin_range.is_valid(),
            "invalid skin range {}",
            self.skin_range
        );
        ensure!(
            self.canvas_width > 0.0,
            "canvas width must be positive, got {}",
            self.canvas_width
        );
        ensure!(
            (1..=127).contains(&self.velocity),
            "velocity must be within 1..=127, got {}",
            self.velocity
        );
        self.detection_zone()?;
        Ok(())
    }

    pub fn frame_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.frame_width as f32, self.frame_height as f32)
    }

    pub fn detection_zone(&self) -> Result<DetectionZone> {
        match self.zone {
            Some(edges) => DetectionZone::with_edges(
                self.frame_bounds(),
                edges.left,
                edges.right,
                edges.top,
                edges.bottom,
            )
            .context("Saved detection zone does not fit the frame"),
            None => Ok(DetectionZone::for_frame(
                self.frame_width as f32,
                self.frame_height as f32,
            )),
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            skin_range: self.skin_range,
            morph_iterations: self.detector.morph_iterations,
            max_defect_angle: self.detector.max_defect_angle,
            min_defect_depth: self.detector.min_defect_depth,
            min_contour_area: self.detector.min_contour_area,
        }
    }
}
