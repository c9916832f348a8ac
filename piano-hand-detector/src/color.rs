//! RGB to HSV conversion in the 8-bit convention used by the skin ranges.

use piano_shared::{Hsv, MAX_HUE};

/// RGB color value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert RGB to HSV with hue halved into 0-180 and S, V scaled to 0-255
    pub fn to_hsv(&self) -> Hsv {
        let r = self.r as f32;
        let g = self.g as f32;
        let b = self.b as f32;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        // Hue in degrees
        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (g - b) / delta
        } else if max == g {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        let h = if h < 0.0 { h + 360.0 } else { h };

        let s = if max == 0.0 { 0.0 } else { delta * 255.0 / max };

        let h = ((h / 2.0 + 0.5) as u16 % MAX_HUE as u16) as u8;
        let s = (s + 0.5) as u8;
        let v = max as u8;

        Hsv { h, s, v }
    }
}
