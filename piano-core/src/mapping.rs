//! Fingertip positions and computer-keyboard letters to piano keys.

use crate::keyboard::Keyboard;
use crate::overlay::{DetectionZone, PianoOverlay};
use alloc::vec::Vec;
use piano_shared::{HandReading, KeyId, Note, Position};

/// Home-row letters, left to right
pub const KEYBOARD_BINDINGS: [char; 9] = ['a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l'];

pub type Bindings = heapless::Vec<(char, KeyId), 9>;

/// Bind the letters to target keys. Up to nine targets are bound in order;
/// wider ranges are sampled at even spacing so `a` and `l` hit both ends.
pub fn spread_bindings(targets: &[KeyId]) -> Bindings {
    let mut bindings = Bindings::new();
    let n = targets.len();
    if n == 0 {
        return bindings;
    }

    let spacing = if n > KEYBOARD_BINDINGS.len() {
        Some((n - 1) as f32 / (KEYBOARD_BINDINGS.len() - 1) as f32)
    } else {
        None
    };

    for (i, &letter) in KEYBOARD_BINDINGS.iter().enumerate() {
        let target = match spacing {
            // Ties round to even
            Some(spacing) => {
                let index = libm::rintf(i as f32 * spacing) as usize;
                targets[index.min(n - 1)]
            }
            None => match targets.get(i) {
                Some(&key) => key,
                None => break,
            },
        };
        // Capacity equals the number of letters
        let _ = bindings.push((letter, target));
    }
    bindings
}

/// Letter to key lookup for one set of targets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingMap {
    bindings: Bindings,
}

impl BindingMap {
    pub fn new(targets: &[KeyId]) -> Self {
        Self {
            bindings: spread_bindings(targets),
        }
    }

    pub fn resolve(&self, letter: char) -> Option<KeyId> {
        let letter = letter.to_ascii_lowercase();
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == letter)
            .map(|(_, key)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(char, KeyId)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Maps camera coordinates inside the detection zone onto the piano overlay
#[derive(Debug, Clone, Copy)]
pub struct FingertipMapper<'a> {
    zone: &'a DetectionZone,
    overlay: &'a PianoOverlay,
}

impl<'a> FingertipMapper<'a> {
    pub fn new(zone: &'a DetectionZone, overlay: &'a PianoOverlay) -> Self {
        Self { zone, overlay }
    }

    /// Piano coordinates of a camera position, `None` outside the zone.
    /// `y` is measured from the top of the piano.
    pub fn to_piano(&self, keyboard: &Keyboard, position: Position) -> Option<(f32, f32)> {
        if !self.zone.contains(position.x, position.y) {
            return None;
        }
        let fx = (position.x - self.zone.left()) / self.zone.width();
        let fy = (position.y - self.zone.top()) / self.zone.height();
        Some((
            self.overlay.left() + fx * self.overlay.width(),
            fy * keyboard.height(),
        ))
    }

    pub fn map(&self, keyboard: &Keyboard, position: Position) -> Option<Note> {
        let (x, y) = self.to_piano(keyboard, position)?;
        keyboard.key_at(x, y).and_then(|id| keyboard.note(id))
    }

    /// Notes under every fingertip, sorted, each note once
    pub fn map_reading(&self, keyboard: &Keyboard, reading: &HandReading) -> Vec<Note> {
        let mut notes: Vec<Note> = reading
            .fingertips
            .iter()
            .filter_map(|tip| self.map(keyboard, tip.position))
            .collect();
        notes.sort_unstable();
        notes.dedup();
        notes
    }
}
