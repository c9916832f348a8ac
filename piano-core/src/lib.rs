#![cfg_attr(not(feature = "std"), no_std)]

//! Piano model for the camera piano: keyboard layout, the detection zone in
//! the camera frame, overlays that tie the zone to a stretch of the keyboard,
//! and the mapping from fingertips to key events.

extern crate alloc;

pub mod keyboard;
pub mod mapping;
pub mod overlay;
pub mod press;

pub use keyboard::{Key, Keyboard, KeyboardGeometry, Viewport};
pub use mapping::{spread_bindings, BindingMap, FingertipMapper, KEYBOARD_BINDINGS};
pub use overlay::{DetectionZone, DragHandle, PianoOverlay, ZoneError};
pub use press::PressTracker;

/// Axis-aligned rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open on the right and bottom edges
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }
}
