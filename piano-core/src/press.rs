//! Debouncing of per-frame key touches into press and release events.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use piano_shared::{KeyEvent, Note};

#[derive(Debug, Clone, Copy, Default)]
struct NoteState {
    touched: u32,
    absent: u32,
    pressed: bool,
}

/// Turns the set of notes touched in each frame into key events.
/// A note must be touched on `press_frames` consecutive frames before it is
/// pressed, and missing on `release_frames` consecutive frames before release.
#[derive(Debug, Clone)]
pub struct PressTracker {
    press_frames: u32,
    release_frames: u32,
    states: BTreeMap<Note, NoteState>,
}

impl PressTracker {
    pub fn new(press_frames: u32, release_frames: u32) -> Self {
        Self {
            press_frames: press_frames.max(1),
            release_frames: release_frames.max(1),
            states: BTreeMap::new(),
        }
    }

    /// Feed one frame worth of touched notes. Events come out ordered by note.
    pub fn update(&mut self, touched: &[Note]) -> Vec<KeyEvent> {
        let touched: BTreeSet<Note> = touched.iter().copied().collect();
        for note in &touched {
            self.states.entry(*note).or_default();
        }

        let (press_frames, release_frames) = (self.press_frames, self.release_frames);
        let mut events = Vec::new();
        self.states.retain(|note, state| {
            if touched.contains(note) {
                state.touched += 1;
                state.absent = 0;
                if !state.pressed && state.touched >= press_frames {
                    state.pressed = true;
                    events.push(KeyEvent::Pressed(*note));
                }
                return true;
            }

            if !state.pressed {
                return false;
            }
            state.touched = 0;
            state.absent += 1;
            if state.absent >= release_frames {
                events.push(KeyEvent::Released(*note));
                return false;
            }
            true
        });
        events
    }

    pub fn is_pressed(&self, note: &Note) -> bool {
        self.states.get(note).map_or(false, |s| s.pressed)
    }

    pub fn pressed_notes(&self) -> Vec<Note> {
        self.states
            .iter()
            .filter(|(_, s)| s.pressed)
            .map(|(note, _)| *note)
            .collect()
    }

    /// Release everything currently held and forget pending touches
    pub fn release_all(&mut self) -> Vec<KeyEvent> {
        let events = self
            .pressed_notes()
            .into_iter()
            .map(KeyEvent::Released)
            .collect();
        self.states.clear();
        events
    }
}

impl Default for PressTracker {
    fn default() -> Self {
        Self::new(2, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use piano_shared::KeyId;

    fn note(midi: u8) -> Note {
        Note::new(KeyId::white(midi as usize), midi)
    }

    #[test]
    fn test_press_after_consecutive_frames() {
        let mut tracker = PressTracker::default();
        let c = note(60);
        assert!(tracker.update(&[c]).is_empty());
        assert_eq!(tracker.update(&[c]), vec![KeyEvent::Pressed(c)]);
        // Held: no repeat
        assert!(tracker.update(&[c]).is_empty());
        assert!(tracker.is_pressed(&c));
    }

    #[test]
    fn test_flicker_does_not_press() {
        let mut tracker = PressTracker::default();
        let c = note(60);
        tracker.update(&[c]);
        tracker.update(&[]);
        assert!(tracker.update(&[c]).is_empty());
        assert!(!tracker.is_pressed(&c));
    }

    #[test]
    fn test_release_after_absent_frames() {
        let mut tracker = PressTracker::default();
        let c = note(60);
        tracker.update(&[c]);
        tracker.update(&[c]);

        assert!(tracker.update(&[]).is_empty());
        assert!(tracker.update(&[]).is_empty());
        assert_eq!(tracker.update(&[]), vec![KeyEvent::Released(c)]);
        assert!(!tracker.is_pressed(&c));
        assert!(tracker.update(&[]).is_empty());
    }

    #[test]
    fn test_short_gap_keeps_note_held() {
        let mut tracker = PressTracker::default();
        let c = note(60);
        tracker.update(&[c]);
        tracker.update(&[c]);
        tracker.update(&[]);
        tracker.update(&[]);
        assert!(tracker.update(&[c]).is_empty());
        assert!(tracker.update(&[]).is_empty());
        assert!(tracker.is_pressed(&c));
    }

    #[test]
    fn test_events_sorted_by_note() {
        let mut tracker = PressTracker::new(1, 1);
        let (c, e, g) = (note(60), note(64), note(67));
        assert_eq!(
            tracker.update(&[g, c, e, c]),
            vec![
                KeyEvent::Pressed(c),
                KeyEvent::Pressed(e),
                KeyEvent::Pressed(g)
            ]
        );
        assert_eq!(
            tracker.update(&[e]),
            vec![KeyEvent::Released(c), KeyEvent::Released(g)]
        );
    }

    #[test]
    fn test_release_all() {
        let mut tracker = PressTracker::new(1, 3);
        let (c, e) = (note(60), note(64));
        tracker.update(&[c, e]);
        assert_eq!(tracker.pressed_notes(), vec![c, e]);
        assert_eq!(
            tracker.release_all(),
            vec![KeyEvent::Released(c), KeyEvent::Released(e)]
        );
        assert!(tracker.pressed_notes().is_empty());
        assert!(tracker.release_all().is_empty());
    }
}
