//! Camera piano client: settings, the per-frame session, sound output and
//! (with the `camera` feature) live webcam capture.

#[cfg(feature = "camera")]
pub mod camera;
pub mod config;
pub mod frames;
pub mod session;
pub mod sound;

pub use config::Settings;
pub use frames::CapturedFrame;
pub use session::{FrameOutcome, Mode, PianoSession};
pub use sound::{NoteSink, Player};
