//! Detection zone in the camera frame and the overlays that tie it to keys.

use crate::keyboard::Keyboard;
use crate::Rect;
use alloc::vec::Vec;
use piano_shared::KeyId;

/// Smallest distance between opposite zone edges
pub const MIN_ZONE_SIZE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ZoneError {
    #[error("zone {left}..{right} x {top}..{bottom} is outside the {width}x{height} frame")]
    OutOfBounds {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        width: f32,
        height: f32,
    },
    #[error("zone is {width}x{height}, both sides must be at least 10 px")]
    TooSmall { width: f32, height: f32 },
}

/// Part of the zone outline being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragHandle {
    LeftEdge,
    RightEdge,
    /// Both vertical lines together
    Body,
    LeftTop,
    LeftBottom,
    RightTop,
    RightBottom,
    MiddleTop,
    MiddleBottom,
}

/// Rectangle of the camera frame where fingertips count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionZone {
    bounds: Rect,
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

impl DetectionZone {
    /// Default zone for a frame: middle 40 % horizontally, middle half vertically
    pub fn for_frame(width: f32, height: f32) -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, width, height),
            left: width * 0.3,
            right: width * 0.7,
            top: height * 0.25,
            bottom: height * 0.75,
        }
    }

    pub fn with_edges(
        bounds: Rect,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
    ) -> Result<Self, ZoneError> {
        if right - left < MIN_ZONE_SIZE || bottom - top < MIN_ZONE_SIZE {
            return Err(ZoneError::TooSmall {
                width: right - left,
                height: bottom - top,
            });
        }
        if left < bounds.left()
            || right > bounds.right()
            || top < bounds.top()
            || bottom > bounds.bottom()
        {
            return Err(ZoneError::OutOfBounds {
                left,
                right,
                top,
                bottom,
                width: bounds.width,
                height: bounds.height,
            });
        }
        Ok(Self {
            bounds,
            left,
            right,
            top,
            bottom,
        })
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width(), self.height())
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.rect().contains(x, y)
    }

    /// Move a handle by a mouse delta. Edges never cross and never leave the frame.
    pub fn drag(&mut self, handle: DragHandle, dx: f32, dy: f32) {
        match handle {
            DragHandle::LeftEdge => self.move_left(dx),
            DragHandle::RightEdge => self.move_right(dx),
            DragHandle::Body => {
                if self.left + dx >= self.bounds.left() && self.right + dx <= self.bounds.right() {
                    self.left += dx;
                    self.right += dx;
                }
            }
            DragHandle::LeftTop => {
                self.move_left(dx);
                self.move_top(dy);
            }
            DragHandle::LeftBottom => {
                self.move_left(dx);
                self.move_bottom(dy);
            }
            DragHandle::RightTop => {
                self.move_right(dx);
                self.move_top(dy);
            }
            DragHandle::RightBottom => {
                self.move_right(dx);
                self.move_bottom(dy);
            }
            DragHandle::MiddleTop => self.move_top(dy),
            DragHandle::MiddleBottom => self.move_bottom(dy),
        }
    }

    fn move_left(&mut self, dx: f32) {
        self.left = (self.left + dx)
            .min(self.right - MIN_ZONE_SIZE)
            .max(self.bounds.left());
    }

    fn move_right(&mut self, dx: f32) {
        self.right = (self.right + dx)
            .max(self.left + MIN_ZONE_SIZE)
            .min(self.bounds.right());
    }

    fn move_top(&mut self, dy: f32) {
        self.top = (self.top + dy)
            .min(self.bottom - MIN_ZONE_SIZE)
            .max(self.bounds.top());
    }

    fn move_bottom(&mut self, dy: f32) {
        self.bottom = (self.bottom + dy)
            .max(self.top + MIN_ZONE_SIZE)
            .min(self.bounds.bottom());
    }
}

impl Default for DetectionZone {
    fn default() -> Self {
        Self::for_frame(640.0, 480.0)
    }
}

/// Left edge for something `width` wide placed along the piano by a 0..1 slider
fn slide_along(keyboard: &Keyboard, width: f32, slider: f32) -> f32 {
    keyboard.left() + (keyboard.width() - width) * slider
}

/// Stretch of piano the detection zone maps onto, one camera pixel per piano pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PianoOverlay {
    slider: f32,
    left: f32,
    width: f32,
}

impl PianoOverlay {
    pub fn new(keyboard: &Keyboard, zone: &DetectionZone, slider: f32) -> Self {
        let mut overlay = Self {
            slider: slider.clamp(0.0, 1.0),
            left: 0.0,
            width: zone.width(),
        };
        overlay.follow_zone(keyboard, zone);
        overlay
    }

    /// Recompute after the zone was resized or moved
    pub fn follow_zone(&mut self, keyboard: &Keyboard, zone: &DetectionZone) {
        self.width = zone.width();
        self.left = slide_along(keyboard, self.width, self.slider);
    }

    pub fn set_slider(&mut self, keyboard: &Keyboard, slider: f32) {
        self.slider = slider.clamp(0.0, 1.0);
        self.left = slide_along(keyboard, self.width, self.slider);
    }

    pub fn slider(&self) -> f32 {
        self.slider
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn keys(&self, keyboard: &Keyboard) -> Vec<KeyId> {
        keyboard.white_keys_overlapping(self.left(), self.right())
    }
}
