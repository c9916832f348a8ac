//! 88-key piano layout, from A0 to C8.

use alloc::vec::Vec;
use piano_shared::{KeyColor, KeyId, Note};

/// MIDI number of the leftmost key (A0)
pub const FIRST_MIDI: u8 = 21;
pub const KEY_COUNT: u8 = 88;

/// White/black pattern of one octave starting at C
const KEY_PATTERN: [bool; 12] = [
    true, false, true, false, true, true, false, true, false, true, false, true,
];

pub fn is_white(midi: u8) -> bool {
    KEY_PATTERN[(midi % 12) as usize]
}

/// Pixel dimensions of the drawn piano
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardGeometry {
    /// Width of the area the piano is centred in
    pub canvas_width: f32,
    pub white_key_width: f32,
    /// Black key width relative to a white key
    pub black_key_ratio: f32,
    pub height: f32,
    /// Black key height relative to the piano height
    pub black_height_ratio: f32,
}

impl Default for KeyboardGeometry {
    fn default() -> Self {
        Self {
            canvas_width: 1600.0,
            white_key_width: 24.0,
            black_key_ratio: 0.6,
            height: 220.0,
            black_height_ratio: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key {
    pub id: KeyId,
    pub midi: u8,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl Key {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn note(&self) -> Note {
        Note::new(self.id, self.midi)
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        self.left <= x && x < self.right() && y >= 0.0 && y < self.height
    }
}

#[derive(Debug, Clone)]
pub struct Keyboard {
    geometry: KeyboardGeometry,
    left: f32,
    white: Vec<Key>,
    black: Vec<Key>,
}

impl Keyboard {
    pub fn new(geometry: KeyboardGeometry) -> Self {
        let w = geometry.white_key_width;
        let white_count = (FIRST_MIDI..FIRST_MIDI + KEY_COUNT)
            .filter(|&m| is_white(m))
            .count();
        let width = white_count as f32 * w;
        let left = if geometry.canvas_width > width {
            libm::floorf((geometry.canvas_width - width) / 2.0)
        } else {
            0.0
        };

        let mut white = Vec::with_capacity(white_count);
        let mut black = Vec::new();
        for midi in FIRST_MIDI..FIRST_MIDI + KEY_COUNT {
            if is_white(midi) {
                white.push(Key {
                    id: KeyId::white(white.len()),
                    midi,
                    left: left + white.len() as f32 * w,
                    width: w,
                    height: geometry.height,
                });
            } else {
                // Sits over the boundary after the previous white key
                let previous = white.len().saturating_sub(1) as f32;
                black.push(Key {
                    id: KeyId::black(black.len()),
                    midi,
                    left: left + previous * w + 0.75 * w,
                    width: w * geometry.black_key_ratio,
                    height: geometry.height * geometry.black_height_ratio,
                });
            }
        }

        Self {
            geometry,
            left,
            white,
            black,
        }
    }

    pub fn geometry(&self) -> &KeyboardGeometry {
        &self.geometry
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn width(&self) -> f32 {
        self.white.len() as f32 * self.geometry.white_key_width
    }

    pub fn right(&self) -> f32 {
        self.left + self.width()
    }

    pub fn height(&self) -> f32 {
        self.geometry.height
    }

    pub fn white_keys(&self) -> &[Key] {
        &self.white
    }

    pub fn black_keys(&self) -> &[Key] {
        &self.black
    }

    pub fn key(&self, id: KeyId) -> Option<&Key> {
        match id.color {
            KeyColor::White => self.white.get(id.index),
            KeyColor::Black => self.black.get(id.index),
        }
    }

    pub fn note(&self, id: KeyId) -> Option<Note> {
        self.key(id).map(Key::note)
    }

    pub fn white_key_at(&self, x: f32) -> Option<KeyId> {
        self.white
            .iter()
            .find(|k| k.left <= x && x < k.right())
            .map(|k| k.id)
    }

    /// Key under a point, with `y` measured from the top of the piano.
    /// Black keys lie on top of the white ones and are tested first.
    pub fn key_at(&self, x: f32, y: f32) -> Option<KeyId> {
        if y < 0.0 || y >= self.height() {
            return None;
        }
        if let Some(key) = self.black.iter().find(|k| k.contains(x, y)) {
            return Some(key.id);
        }
        self.white_key_at(x)
    }

    /// White keys touching the closed interval `[left, right]`
    pub fn white_keys_overlapping(&self, left: f32, right: f32) -> Vec<KeyId> {
        self.white
            .iter()
            .filter(|k| k.left <= right && k.right() >= left)
            .map(|k| k.id)
            .collect()
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new(KeyboardGeometry::default())
    }
}

/// Horizontal scroll window over the piano. `scroll` is measured from the
/// piano's left edge, so the window covers
/// `[keyboard.left() + scroll, keyboard.left() + scroll + width)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll: f32,
    pub width: f32,
}

impl Viewport {
    pub fn new(width: f32) -> Self {
        Self { scroll: 0.0, width }
    }

    pub fn max_scroll(&self, keyboard: &Keyboard) -> f32 {
        (keyboard.width() - self.width).max(0.0)
    }

    pub fn scroll_by(&mut self, keyboard: &Keyboard, amount: f32) {
        self.scroll = (self.scroll + amount).clamp(0.0, self.max_scroll(keyboard));
    }

    /// White keys drawn at least partly inside the window
    pub fn visible_white_keys(&self, keyboard: &Keyboard) -> Vec<KeyId> {
        let start = keyboard.left() + self.scroll;
        let end = start + self.width;
        keyboard
            .white_keys()
            .iter()
            .filter(|k| k.right() > start && k.left < end)
            .map(|k| k.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_layout() {
        let keyboard = Keyboard::default();
        assert_eq!(keyboard.white_keys().len(), 52);
        assert_eq!(keyboard.black_keys().len(), 36);
        assert_eq!(keyboard.width(), 1248.0);
        assert_eq!(keyboard.left(), 176.0);
        assert_eq!(keyboard.right(), 1424.0);

        let a0 = keyboard.white_keys()[0];
        assert_eq!(a0.midi, 21);
        assert_eq!(a0.left, 176.0);
        let c8 = keyboard.white_keys()[51];
        assert_eq!(c8.midi, 108);

        let a_sharp0 = keyboard.black_keys()[0];
        assert_eq!(a_sharp0.midi, 22);
        assert_eq!(a_sharp0.left, 194.0);
        assert!((a_sharp0.width - 14.4).abs() < 1e-4);
        assert!((a_sharp0.height - 132.0).abs() < 1e-4);
    }

    #[test]
    fn test_middle_c() {
        let keyboard = Keyboard::default();
        let note = keyboard.note(KeyId::white(23)).unwrap();
        assert_eq!(note.midi, 60);
        assert_eq!(keyboard.note(KeyId::white(52)), None);
    }

    #[test]
    fn test_narrow_canvas_starts_at_zero() {
        let keyboard = Keyboard::new(KeyboardGeometry {
            canvas_width: 800.0,
            ..KeyboardGeometry::default()
        });
        assert_eq!(keyboard.left(), 0.0);
    }

    #[test]
    fn test_key_at_prefers_black_keys() {
        let keyboard = Keyboard::default();
        // Inside A#0 near the top of the piano
        assert_eq!(keyboard.key_at(200.0, 10.0), Some(KeyId::black(0)));
        // Same x below the black key reaches the white key B0
        assert_eq!(keyboard.key_at(200.0, 200.0), Some(KeyId::white(1)));
        assert_eq!(keyboard.key_at(180.0, 10.0), Some(KeyId::white(0)));
        assert_eq!(keyboard.key_at(200.0, 220.0), None);
        assert_eq!(keyboard.key_at(100.0, 10.0), None);
    }

    #[test]
    fn test_white_key_at_edges() {
        let keyboard = Keyboard::default();
        assert_eq!(keyboard.white_key_at(176.0), Some(KeyId::white(0)));
        assert_eq!(keyboard.white_key_at(200.0), Some(KeyId::white(1)));
        assert_eq!(keyboard.white_key_at(1424.0), None);
    }

    #[test]
    fn test_white_keys_overlapping_includes_touching() {
        let keyboard = Keyboard::default();
        assert_eq!(
            keyboard.white_keys_overlapping(200.0, 224.0),
            vec![KeyId::white(0), KeyId::white(1), KeyId::white(2)]
        );
    }

    #[test]
    fn test_viewport_scroll_clamps() {
        let keyboard = Keyboard::default();
        let mut wide = Viewport::new(1600.0);
        wide.scroll_by(&keyboard, 300.0);
        assert_eq!(wide.scroll, 0.0);
        assert_eq!(wide.visible_white_keys(&keyboard).len(), 52);

        let mut narrow = Viewport::new(400.0);
        let visible = narrow.visible_white_keys(&keyboard);
        assert_eq!(visible.first(), Some(&KeyId::white(0)));
        assert_eq!(visible.last(), Some(&KeyId::white(16)));

        // Fully scrolled right the window ends at C8
        narrow.scroll_by(&keyboard, 1000.0);
        assert_eq!(narrow.scroll, 848.0);
        let visible = narrow.visible_white_keys(&keyboard);
        assert_eq!(visible.first(), Some(&KeyId::white(35)));
        assert_eq!(visible.last(), Some(&KeyId::white(51)));

        narrow.scroll_by(&keyboard, -5000.0);
        assert_eq!(narrow.scroll, 0.0);
    }

    #[test]
    fn test_viewport_on_narrow_canvas() {
        // The piano does not fit, so it starts at 0 and the canvas scrolls
        let keyboard = Keyboard::new(KeyboardGeometry {
            canvas_width: 800.0,
            ..KeyboardGeometry::default()
        });
        let mut viewport = Viewport::new(800.0);
        assert_eq!(viewport.visible_white_keys(&keyboard).len(), 34);

        viewport.scroll_by(&keyboard, 50.0);
        let visible = viewport.visible_white_keys(&keyboard);
        assert_eq!(visible.first(), Some(&KeyId::white(2)));
        assert_eq!(visible.last(), Some(&KeyId::white(35)));
    }
}
