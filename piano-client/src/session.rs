use crate::config::{Settings, ZoneEdges};
use anyhow::Result;
use piano_core::{
    BindingMap, DetectionZone, DragHandle, FingertipMapper, Keyboard, KeyboardGeometry,
    PianoOverlay, PressTracker, Viewport,
};
use piano_hand_detector::{
    CalibrationConfig, CalibrationSession, CalibrationStatus, FrameView, HandDetector,
};
use piano_shared::{HandReading, HsvRange, KeyEvent, KeyId, Note};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Detecting,
    Calibrating,
}

/// What happened on one processed frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    pub reading: Option<HandReading>,
    /// Notes under a fingertip on this frame
    pub touched: Vec<Note>,
    pub events: Vec<KeyEvent>,
    /// Set while calibrating
    pub calibration: Option<CalibrationStatus>,
}

/// Detector, piano model and key state for one run of the app
pub struct PianoSession {
    detector: HandDetector,
    keyboard: Keyboard,
    viewport: Viewport,
    zone: DetectionZone,
    piano_overlay: PianoOverlay,
    piano_overlay_active: bool,
    /// Letters play notes only while this is on
    keyboard_overlay_active: bool,
    tracker: PressTracker,
    calibration_config: CalibrationConfig,
    calibration: Option<CalibrationSession>,
    held_letters: BTreeMap<char, Note>,
    frame_width: usize,
    frame_height: usize,
}

impl PianoSession {
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let keyboard = Keyboard::new(KeyboardGeometry {
            canvas_width: settings.canvas_width,
            ..KeyboardGeometry::default()
        });
        let viewport = Viewport::new(keyboard.geometry().canvas_width);
        let zone = settings.detection_zone()?;
        let piano_overlay = PianoOverlay::new(&keyboard, &zone, settings.piano_slider);

        log::info!(
            "Piano ready: {} white and {} black keys, zone {}x{} at ({}, {})",
            keyboard.white_keys().len(),
            keyboard.black_keys().len(),
            zone.width(),
            zone.height(),
            zone.left(),
            zone.top()
        );

        Ok(Self {
            detector: HandDetector::with_config(settings.detector_config()),
            keyboard,
            viewport,
            zone,
            piano_overlay,
            piano_overlay_active: settings.piano_overlay,
            keyboard_overlay_active: settings.keyboard_overlay,
            tracker: PressTracker::new(settings.press_frames, settings.release_frames),
            calibration_config: CalibrationConfig::default(),
            calibration: None,
            held_letters: BTreeMap::new(),
            frame_width: settings.frame_width as usize,
            frame_height: settings.frame_height as usize,
        })
    }

    pub fn with_calibration_config(mut self, config: CalibrationConfig) -> Self {
        self.calibration_config = config;
        self
    }

    pub fn mode(&self) -> Mode {
        if self.calibration.is_some() {
            Mode::Calibrating
        } else {
            Mode::Detecting
        }
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn zone(&self) -> &DetectionZone {
        &self.zone
    }

    pub fn piano_overlay(&self) -> &PianoOverlay {
        &self.piano_overlay
    }

    pub fn piano_overlay_active(&self) -> bool {
        self.piano_overlay_active
    }

    pub fn keyboard_overlay_active(&self) -> bool {
        self.keyboard_overlay_active
    }

    pub fn skin_range(&self) -> HsvRange {
        self.detector.skin_range()
    }

    pub fn calibration(&self) -> Option<&CalibrationSession> {
        self.calibration.as_ref()
    }

    pub fn pressed_notes(&self) -> Vec<Note> {
        self.tracker.pressed_notes()
    }

    /// Run one camera frame through calibration or detection
    pub fn process_frame(&mut self, frame: &FrameView<'_>) -> Result<FrameOutcome> {
        if let Some(calibration) = self.calibration.as_mut() {
            let status = calibration.process(frame);
            match status {
                CalibrationStatus::Collecting { seconds_left } => {
                    log::debug!("Calibrating, {}s left", seconds_left);
                }
                CalibrationStatus::Complete(range) => {
                    log::info!("Calibration complete: {}", range);
                    self.detector.set_skin_range(range);
                    self.calibration = None;
                }
                CalibrationStatus::Failed => {
                    log::warn!("Calibration collected no samples, keeping {}", self.skin_range());
                    self.calibration = None;
                }
            }
            return Ok(FrameOutcome {
                calibration: Some(status),
                ..FrameOutcome::default()
            });
        }

        let reading = self.detector.detect(frame)?;
        let touched = match &reading {
            // Without the piano overlay there is no stretch of keys to map onto
            Some(_) if !self.piano_overlay_active => Vec::new(),
            Some(reading) => {
                log::trace!(
                    "Hand area {:.0}, {} fingertip candidates",
                    reading.contour_area,
                    reading.fingertips.len()
                );
                FingertipMapper::new(&self.zone, &self.piano_overlay)
                    .map_reading(&self.keyboard, reading)
            }
            None => Vec::new(),
        };

        let events = self.tracker.update(&touched);
        for event in &events {
            log::debug!("{:?} {}", event, event.note().name());
        }

        Ok(FrameOutcome {
            reading,
            touched,
            events,
            calibration: None,
        })
    }

    /// Release held notes and start sampling skin color from the center box
    pub fn start_calibration(&mut self) -> Vec<KeyEvent> {
        let events = self.release_all();
        let calibration =
            CalibrationSession::new(self.calibration_config, self.frame_width, self.frame_height);
        log::info!(
            "Calibration started: hold your hand inside the box at ({}, {}) for {}s",
            calibration.roi().x,
            calibration.roi().y,
            calibration.seconds_left()
        );
        self.calibration = Some(calibration);
        events
    }

    /// Abandon calibration, keeping the current range
    pub fn cancel_calibration(&mut self) {
        if self.calibration.take().is_some() {
            log::info!("Calibration cancelled");
        }
    }

    /// Keys the home-row letters are spread over: the piano overlay's keys
    /// while it is shown, otherwise the white keys in the scroll window
    pub fn binding_targets(&self) -> Vec<KeyId> {
        if self.piano_overlay_active {
            let keys = self.piano_overlay.keys(&self.keyboard);
            if !keys.is_empty() {
                return keys;
            }
        }
        self.viewport.visible_white_keys(&self.keyboard)
    }

    pub fn bindings(&self) -> BindingMap {
        BindingMap::new(&self.binding_targets())
    }

    /// Computer-keyboard press. Ignored unless the keyboard overlay is on;
    /// repeats while held produce nothing.
    pub fn press_letter(&mut self, letter: char) -> Option<KeyEvent> {
        if !self.keyboard_overlay_active {
            return None;
        }
        let letter = letter.to_ascii_lowercase();
        if self.held_letters.contains_key(&letter) {
            return None;
        }
        let key = self.bindings().resolve(letter)?;
        let note = self.keyboard.note(key)?;
        log::debug!("Key {} mapped to {}", letter, note.name());
        self.held_letters.insert(letter, note);
        Some(KeyEvent::Pressed(note))
    }

    /// Releases the note the letter pressed, even if the bindings moved or
    /// the keyboard overlay was turned off since
    pub fn release_letter(&mut self, letter: char) -> Option<KeyEvent> {
        self.held_letters
            .remove(&letter.to_ascii_lowercase())
            .map(KeyEvent::Released)
    }

    /// Release everything held by fingertips or letters
    pub fn release_all(&mut self) -> Vec<KeyEvent> {
        let mut events = self.tracker.release_all();
        events.extend(
            std::mem::take(&mut self.held_letters)
                .into_values()
                .map(KeyEvent::Released),
        );
        events.sort_by_key(|e| e.note());
        events.dedup();
        events
    }

    pub fn drag_zone(&mut self, handle: DragHandle, dx: f32, dy: f32) {
        self.zone.drag(handle, dx, dy);
        self.piano_overlay.follow_zone(&self.keyboard, &self.zone);
    }

    pub fn set_overlay_slider(&mut self, slider: f32) {
        self.piano_overlay.set_slider(&self.keyboard, slider);
    }

    /// Turn letter playing on or off; returns whether it is now on
    pub fn toggle_keyboard_overlay(&mut self) -> bool {
        self.keyboard_overlay_active = !self.keyboard_overlay_active;
        if self.keyboard_overlay_active {
            log::info!("Keyboard overlay added, use A-S-D-F-G-H-J-K-L to play");
        } else {
            log::info!("Keyboard overlay removed");
        }
        self.keyboard_overlay_active
    }

    /// Show or hide the piano overlay. While hidden, fingertips play nothing
    /// and letters cover the visible keys.
    pub fn toggle_piano_overlay(&mut self) -> Vec<KeyEvent> {
        self.piano_overlay_active = !self.piano_overlay_active;
        if self.piano_overlay_active {
            log::info!("Piano overlay added");
            Vec::new()
        } else {
            log::info!("Piano overlay removed");
            self.tracker.release_all()
        }
    }

    pub fn scroll_piano(&mut self, amount: f32) {
        self.viewport.scroll_by(&self.keyboard, amount);
    }

    /// Current zone, sliders and skin range folded into `base`
    pub fn settings(&self, base: &Settings) -> Settings {
        Settings {
            skin_range: self.skin_range(),
            zone: Some(ZoneEdges::from(&self.zone)),
            piano_slider: self.piano_overlay.slider(),
            piano_overlay: self.piano_overlay_active,
            keyboard_overlay: self.keyboard_overlay_active,
            ..base.clone()
        }
    }
}

/// Letter presses from a source that reports key-down only, such as a
/// HighGUI window. Each tap holds its note for a number of frames and is
/// released by `tick` unless the letter is tapped again.
#[derive(Debug, Clone)]
pub struct LetterTaps {
    hold_frames: u32,
    remaining: BTreeMap<char, u32>,
}

impl LetterTaps {
    pub fn new(hold_frames: u32) -> Self {
        Self {
            hold_frames: hold_frames.max(1),
            remaining: BTreeMap::new(),
        }
    }

    pub fn tap(&mut self, session: &mut PianoSession, letter: char) -> Option<KeyEvent> {
        let letter = letter.to_ascii_lowercase();
        if let Some(frames) = self.remaining.get_mut(&letter) {
            *frames = self.hold_frames;
            return None;
        }
        let event = session.press_letter(letter)?;
        self.remaining.insert(letter, self.hold_frames);
        Some(event)
    }

    /// Advance one frame, releasing letters whose hold ran out
    pub fn tick(&mut self, session: &mut PianoSession) -> Vec<KeyEvent> {
        let mut expired = Vec::new();
        self.remaining.retain(|&letter, frames| {
            *frames -= 1;
            if *frames == 0 {
                expired.push(letter);
            }
            *frames > 0
        });
        expired
            .into_iter()
            .filter_map(|letter| session.release_letter(letter))
            .collect()
    }

    /// Forget pending holds, e.g. after the session released everything
    pub fn clear(&mut self) {
        self.remaining.clear();
    }
}
