//! Note output: MIDI when a port is available, otherwise the log.

use piano_shared::{KeyEvent, Note};
use std::collections::BTreeSet;

/// Anything that can sound a note
pub trait NoteSink: Send {
    fn note_on(&mut self, note: Note, velocity: u8);
    fn note_off(&mut self, note: Note);
}

/// Writes notes to the log instead of playing them
#[derive(Debug, Default)]
pub struct LogSink;

impl NoteSink for LogSink {
    fn note_on(&mut self, note: Note, velocity: u8) {
        log::info!(
            "Playing {} (midi {}, velocity {})",
            note.name(),
            note.midi,
            velocity
        );
    }

    fn note_off(&mut self, note: Note) {
        log::debug!("Released {}", note.name());
    }
}

#[cfg(feature = "midi")]
pub use midi::MidiSink;

#[cfg(feature = "midi")]
mod midi {
    use super::NoteSink;
    use piano_shared::Note;

    const CHANNEL: u8 = 0;
    /// General MIDI acoustic grand piano
    const PIANO_PROGRAM: u8 = 0;

    pub struct MidiSink {
        conn: midir::MidiOutputConnection,
    }

    impl MidiSink {
        /// Connect to the first software synthesizer port, or the first port.
        /// Returns `None` when there is nothing to connect to.
        pub fn open(client_name: &str) -> Option<Self> {
            let output = match midir::MidiOutput::new(client_name) {
                Ok(output) => output,
                Err(e) => {
                    log::warn!("MIDI init error: {}", e);
                    return None;
                }
            };

            let ports = output.ports();
            if ports.is_empty() {
                log::warn!("No MIDI output ports found");
                log::info!("Start a synthesizer such as `fluidsynth` or `timidity -iA` for sound");
                return None;
            }

            let port = ports
                .iter()
                .find(|p| {
                    output
                        .port_name(p)
                        .map(|n| {
                            let n = n.to_lowercase();
                            n.contains("fluid")
                                || n.contains("timidity")
                                || n.contains("microsoft")
                                || n.contains("synth")
                        })
                        .unwrap_or(false)
                })
                .unwrap_or(&ports[0]);
            let name = output
                .port_name(port)
                .unwrap_or_else(|_| "Unknown".to_string());

            match output.connect(port, "piano-out") {
                Ok(mut conn) => {
                    log::info!("Opened MIDI port: {}", name);
                    let _ = conn.send(&[0xC0 | CHANNEL, PIANO_PROGRAM]);
                    Some(Self { conn })
                }
                Err(e) => {
                    log::warn!("Failed to connect to MIDI port {}: {}", name, e);
                    None
                }
            }
        }
    }

    impl NoteSink for MidiSink {
        fn note_on(&mut self, note: Note, velocity: u8) {
            if let Err(e) = self.conn.send(&[0x90 | CHANNEL, note.midi, velocity]) {
                log::warn!("MIDI send failed: {}", e);
            }
        }

        fn note_off(&mut self, note: Note) {
            if let Err(e) = self.conn.send(&[0x80 | CHANNEL, note.midi, 0]) {
                log::warn!("MIDI send failed: {}", e);
            }
        }
    }
}

/// Best available sink for this build
pub fn open_output() -> Box<dyn NoteSink> {
    #[cfg(feature = "midi")]
    {
        if let Some(sink) = MidiSink::open("hand-piano") {
            return Box::new(sink);
        }
        log::warn!("Falling back to logging notes");
    }
    Box::new(LogSink)
}

/// Applies key events to a sink, keeping track of what is sounding
pub struct Player {
    sink: Box<dyn NoteSink>,
    velocity: u8,
    sounding: BTreeSet<Note>,
}

impl Player {
    pub fn new(sink: Box<dyn NoteSink>, velocity: u8) -> Self {
        Self {
            sink,
            velocity,
            sounding: BTreeSet::new(),
        }
    }

    pub fn handle(&mut self, event: &KeyEvent) {
        match *event {
            KeyEvent::Pressed(note) => {
                // Restart a note that is still ringing
                if self.sounding.contains(&note) {
                    self.sink.note_off(note);
                }
                self.sink.note_on(note, self.velocity);
                self.sounding.insert(note);
            }
            KeyEvent::Released(note) => {
                if self.sounding.remove(&note) {
                    self.sink.note_off(note);
                }
            }
        }
    }

    pub fn handle_all(&mut self, events: &[KeyEvent]) {
        for event in events {
            self.handle(event);
        }
    }

    pub fn sounding(&self) -> impl Iterator<Item = &Note> {
        self.sounding.iter()
    }

    pub fn stop_all(&mut self) {
        for note in std::mem::take(&mut self.sounding) {
            self.sink.note_off(note);
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piano_shared::KeyId;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        On(u8, u8),
        Off(u8),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl NoteSink for Recorder {
        fn note_on(&mut self, note: Note, velocity: u8) {
            self.calls.lock().unwrap().push(Call::On(note.midi, velocity));
        }

        fn note_off(&mut self, note: Note) {
            self.calls.lock().unwrap().push(Call::Off(note.midi));
        }
    }

    fn note(midi: u8) -> Note {
        Note::new(KeyId::white(0), midi)
    }

    #[test]
    fn test_press_restarts_ringing_note() {
        let recorder = Recorder::default();
        let mut player = Player::new(Box::new(recorder.clone()), 90);
        player.handle(&KeyEvent::Pressed(note(60)));
        player.handle(&KeyEvent::Pressed(note(60)));
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec![Call::On(60, 90), Call::Off(60), Call::On(60, 90)]
        );
    }

    #[test]
    fn test_release_of_silent_note_is_ignored() {
        let recorder = Recorder::default();
        let mut player = Player::new(Box::new(recorder.clone()), 90);
        player.handle(&KeyEvent::Released(note(60)));
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_silences_everything() {
        let recorder = Recorder::default();
        {
            let mut player = Player::new(Box::new(recorder.clone()), 90);
            player.handle_all(&[KeyEvent::Pressed(note(60)), KeyEvent::Pressed(note(64))]);
            assert_eq!(player.sounding().count(), 2);
        }
        let calls = recorder.calls.lock().unwrap();
        assert_eq!(&calls[2..], &[Call::Off(60), Call::Off(64)]);
    }
}
