#![cfg_attr(not(feature = "std"), no_std)]

//! Types shared by the detector, the mapping core and the client.

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Represents a 2D position in image or piano coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another position
    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        libm::sqrtf(dx * dx + dy * dy)
    }
}

/// HSV triple in the 8-bit convention: hue 0-180, saturation and value 0-255
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

/// Largest hue value in the 8-bit convention
pub const MAX_HUE: u8 = 180;

/// Inclusive HSV range used to classify skin pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    /// Range that works for a fair share of skin tones under indoor light
    pub const DEFAULT_SKIN: HsvRange = HsvRange {
        lower: Hsv::new(0, 20, 70),
        upper: Hsv::new(20, 255, 255),
    };

    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }

    /// Lower bound not above upper bound on every channel, hue within 0-180
    pub fn is_valid(&self) -> bool {
        self.lower.h <= self.upper.h
            && self.lower.s <= self.upper.s
            && self.lower.v <= self.upper.v
            && self.upper.h <= MAX_HUE
    }
}

impl Default for HsvRange {
    fn default() -> Self {
        Self::DEFAULT_SKIN
    }
}

impl fmt::Display for HsvRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "H:{}-{}, S:{}-{}, V:{}-{}",
            self.lower.h, self.upper.h, self.lower.s, self.upper.s, self.lower.v, self.upper.v
        )
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// How a fingertip candidate was found
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FingertipSource {
    /// End point of a sharp convexity defect
    Defect,
    /// Topmost point of the hand contour
    Topmost,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Fingertip {
    pub position: Position,
    pub source: FingertipSource,
}

impl Fingertip {
    pub fn new(position: Position, source: FingertipSource) -> Self {
        Self { position, source }
    }
}

/// Result of running the detector on one frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandReading {
    pub fingertips: Vec<Fingertip>,
    pub contour_area: f32,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyColor {
    White,
    Black,
}

/// Key identifier: color plus index among keys of that color, left to right
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId {
    pub color: KeyColor,
    pub index: usize,
}

impl KeyId {
    pub fn white(index: usize) -> Self {
        Self {
            color: KeyColor::White,
            index,
        }
    }

    pub fn black(index: usize) -> Self {
        Self {
            color: KeyColor::Black,
            index,
        }
    }
}

/// A playable piano key together with its MIDI note number
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Note {
    pub midi: u8,
    pub key: KeyId,
}

impl Note {
    pub fn new(key: KeyId, midi: u8) -> Self {
        Self { midi, key }
    }

    pub fn name(&self) -> NoteName {
        NoteName(self.midi)
    }
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Scientific pitch name of a MIDI note, e.g. `A0` or `C#4`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteName(pub u8);

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pitch = NOTE_NAMES[(self.0 % 12) as usize];
        let octave = i32::from(self.0 / 12) - 1;
        write!(f, "{}{}", pitch, octave)
    }
}

/// Key state change produced by fingertips or the computer keyboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum KeyEvent {
    Pressed(Note),
    Released(Note),
}

impl KeyEvent {
    pub fn note(&self) -> Note {
        match self {
            KeyEvent::Pressed(note) | KeyEvent::Released(note) => *note,
        }
    }

    pub fn is_press(&self) -> bool {
        matches!(self, KeyEvent::Pressed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_position_distance() {
        let p1 = Position::new(0.0, 0.0);
        let p2 = Position::new(3.0, 4.0);
        assert_eq!(p1.distance_to(&p2), 5.0);
    }

    #[test]
    fn test_default_skin_range_contains() {
        let range = HsvRange::default();
        assert!(range.contains(Hsv::new(15, 85, 180)));
        assert!(range.contains(Hsv::new(0, 20, 70)));
        assert!(!range.contains(Hsv::new(21, 85, 180)));
        assert!(!range.contains(Hsv::new(10, 0, 255)));
    }

    #[test]
    fn test_range_validity() {
        assert!(HsvRange::DEFAULT_SKIN.is_valid());
        let inverted = HsvRange::new(Hsv::new(30, 20, 70), Hsv::new(20, 255, 255));
        assert!(!inverted.is_valid());
        let hue_overflow = HsvRange::new(Hsv::new(0, 0, 0), Hsv::new(200, 255, 255));
        assert!(!hue_overflow.is_valid());
    }

    #[test]
    fn test_range_display() {
        assert_eq!(
            HsvRange::DEFAULT_SKIN.to_string(),
            "H:0-20, S:20-255, V:70-255"
        );
    }

    #[test]
    fn test_note_names() {
        assert_eq!(NoteName(21).to_string(), "A0");
        assert_eq!(NoteName(61).to_string(), "C#4");
        assert_eq!(NoteName(69).to_string(), "A4");
        assert_eq!(NoteName(108).to_string(), "C8");
    }

    #[test]
    fn test_key_event_serialization() {
        let event = KeyEvent::Pressed(Note::new(KeyId::white(23), 60));
        let json = serde_json::to_string(&event).unwrap();
        let back: KeyEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert!(back.is_press());
        assert_eq!(back.note().name().to_string(), "C4");
    }
}
