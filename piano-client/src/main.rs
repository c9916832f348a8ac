use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use piano_client::frames::{self, CapturedFrame};
use piano_client::session::PianoSession;
use piano_client::sound::{self, Player};
use piano_client::Settings;
use piano_hand_detector::CalibrationStatus;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Play a piano by pointing at a webcam", long_about = None)]
struct Args {
    /// Settings file, created on first save
    #[arg(short, long, global = true, default_value = "piano-settings.json")]
    settings: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play from the live camera (needs the `camera` feature)
    Run {
        /// Do not open the preview window
        #[arg(long)]
        no_window: bool,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,
    },
    /// Detect fingertips in a still image and print them as JSON
    Detect {
        image: PathBuf,

        /// Mirror the image first, as the live camera does
        #[arg(long)]
        mirror: bool,
    },
    /// Sample skin color from the center box and save the new range
    Calibrate {
        /// Calibrate from a photo instead of the live camera
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Play with the A-S-D-F-G-H-J-K-L keys, one line of letters at a time
    Keys {
        /// Piano overlay position along the piano, 0 to 1
        #[arg(long, conflicts_with = "visible")]
        slider: Option<f32>,

        /// Hide the piano overlay and spread the letters over the visible keys
        #[arg(long)]
        visible: bool,

        /// Scroll the piano window this many pixels to the right
        #[arg(long, requires = "visible")]
        scroll: Option<f32>,
    },
}

/// Options of the `keys` command
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct KeysOptions {
    slider: Option<f32>,
    visible: bool,
    scroll: Option<f32>,
}

fn detect_image(settings: &Settings, path: &Path, mirror: bool) -> Result<()> {
    let frame = frames::load_image(path, settings.frame_width, settings.frame_height, mirror)?;
    let mut session = PianoSession::new(settings)?;
    let outcome = session.process_frame(&frame.view()?)?;

    let notes: Vec<_> = outcome
        .touched
        .iter()
        .map(|note| {
            serde_json::json!({
                "name": note.name().to_string(),
                "midi": note.midi,
                "key": note.key,
            })
        })
        .collect();
    let report = serde_json::json!({
        "image": path.display().to_string(),
        "skin_range": session.skin_range(),
        "reading": outcome.reading,
        "notes": notes,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Feed frames to a fresh calibration until it finishes
fn calibrate_with<F>(settings: &Settings, mut next_frame: F) -> Result<Settings>
where
    F: FnMut() -> Result<CapturedFrame>,
{
    let mut session = PianoSession::new(settings)?;
    session.start_calibration();

    loop {
        let frame = next_frame()?;
        let outcome = session.process_frame(&frame.view()?)?;
        match outcome.calibration {
            Some(CalibrationStatus::Complete(_)) => return Ok(session.settings(settings)),
            Some(CalibrationStatus::Failed) => bail!("Calibration collected no samples"),
            Some(CalibrationStatus::Collecting { .. }) => {}
            None => bail!("Calibration ended unexpectedly"),
        }
    }
}

fn calibrate(settings: &Settings, settings_path: &Path, image: Option<&Path>) -> Result<()> {
    let calibrated = match image {
        Some(path) => {
            let frame =
                frames::load_image(path, settings.frame_width, settings.frame_height, false)?;
            calibrate_with(settings, || Ok(frame.clone()))?
        }
        None => live::calibrate(settings)?,
    };

    log::info!("New skin range: {}", calibrated.skin_range);
    calibrated.save(settings_path)
}

fn play_keys(settings: &Settings, options: KeysOptions) -> Result<()> {
    let mut session = PianoSession::new(&Settings {
        piano_overlay: !options.visible,
        keyboard_overlay: true,
        ..settings.clone()
    })?;
    if let Some(slider) = options.slider {
        session.set_overlay_slider(slider);
    }
    if let Some(scroll) = options.scroll {
        session.scroll_piano(scroll);
    }

    let bindings = session.bindings();
    for (letter, key) in bindings.iter() {
        if let Some(note) = session.keyboard().note(*key) {
            log::info!("{} -> {}", letter, note.name());
        }
    }
    if bindings.is_empty() {
        bail!("No piano keys to bind");
    }

    let mut player = Player::new(sound::open_output(), settings.velocity);
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let letters: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
        for &letter in &letters {
            match session.press_letter(letter) {
                Some(event) => player.handle(&event),
                None => log::debug!("No key bound to {:?}", letter),
            }
        }
        for &letter in &letters {
            if let Some(event) = session.release_letter(letter) {
                player.handle(&event);
            }
        }
    }
    Ok(())
}

#[cfg(feature = "camera")]
mod live {
    use super::*;
    use anyhow::anyhow;
    use opencv::highgui;
    use piano_client::camera::{self, Camera};
    use piano_client::session::LetterTaps;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use std::time::Duration;

    const WINDOW: &str = "Hand Piano";
    /// HighGUI reports key-down only, so a tapped letter sounds this long
    const LETTER_HOLD_FRAMES: u32 = 15;
    const SCROLL_STEP: f32 = 50.0;

    struct Capture {
        frames: Receiver<CapturedFrame>,
        running: Arc<AtomicBool>,
        handle: Option<JoinHandle<()>>,
    }

    impl Capture {
        fn start(settings: &Settings) -> Result<Self> {
            let camera = Camera::open(
                settings.camera_index,
                settings.frame_width,
                settings.frame_height,
            )?;
            let (sender, frames) = mpsc::sync_channel(2);
            let running = Arc::new(AtomicBool::new(true));
            let handle = camera::spawn_capture(camera, sender, running.clone());
            Ok(Self {
                frames,
                running,
                handle: Some(handle),
            })
        }

        fn next(&self) -> Result<CapturedFrame> {
            loop {
                match self.frames.recv_timeout(Duration::from_secs(2)) {
                    Ok(frame) => return Ok(frame),
                    Err(RecvTimeoutError::Timeout) => log::warn!("No frames from camera"),
                    Err(RecvTimeoutError::Disconnected) => bail!("Camera thread stopped"),
                }
            }
        }

        fn stop(&mut self) -> Result<()> {
            self.running.store(false, Ordering::Relaxed);
            if let Some(handle) = self.handle.take() {
                handle
                    .join()
                    .map_err(|_| anyhow!("Camera thread panicked"))?;
            }
            Ok(())
        }
    }

    impl Drop for Capture {
        fn drop(&mut self) {
            self.running.store(false, Ordering::Relaxed);
        }
    }

    pub fn calibrate(settings: &Settings) -> Result<Settings> {
        let mut capture = Capture::start(settings)?;
        let result = calibrate_with(settings, || capture.next());
        capture.stop()?;
        result
    }

    pub fn run(
        settings: &Settings,
        settings_path: &Path,
        show_window: bool,
        max_frames: Option<u64>,
    ) -> Result<()> {
        let mut session = PianoSession::new(settings)?;
        let mut player = Player::new(sound::open_output(), settings.velocity);
        let mut capture = Capture::start(settings)?;
        let mut taps = LetterTaps::new(LETTER_HOLD_FRAMES);

        if show_window {
            highgui::named_window(WINDOW, highgui::WINDOW_AUTOSIZE)?;
            log::info!(
                "Keys: c calibrate, o keyboard overlay, p piano overlay, [ ] scroll, \
                 w save settings, q quit"
            );
        }

        let mut processed = 0u64;
        loop {
            let frame = capture.next()?;
            let outcome = session.process_frame(&frame.view()?)?;
            player.handle_all(&outcome.events);
            player.handle_all(&taps.tick(&mut session));

            if let Some(CalibrationStatus::Complete(_)) = outcome.calibration {
                session.settings(settings).save(settings_path)?;
            }

            processed += 1;
            if max_frames.is_some_and(|max| processed >= max) {
                break;
            }

            if show_window {
                let preview = camera::annotate(
                    &frame,
                    session.zone(),
                    outcome.reading.as_ref(),
                    session.calibration().map(|c| c.roi()),
                )?;
                highgui::imshow(WINDOW, &preview)?;

                match highgui::wait_key(1)? {
                    key if key == i32::from(b'q') || key == 27 => {
                        log::info!("Quit requested");
                        break;
                    }
                    key if key == i32::from(b'c') => {
                        let events = session.start_calibration();
                        taps.clear();
                        player.handle_all(&events);
                    }
                    key if key == i32::from(b'o') => {
                        session.toggle_keyboard_overlay();
                    }
                    key if key == i32::from(b'p') => {
                        let events = session.toggle_piano_overlay();
                        player.handle_all(&events);
                    }
                    key if key == i32::from(b'[') => session.scroll_piano(-SCROLL_STEP),
                    key if key == i32::from(b']') => session.scroll_piano(SCROLL_STEP),
                    key if key == i32::from(b'w') => {
                        session.settings(settings).save(settings_path)?;
                    }
                    key => {
                        let letter = u8::try_from(key).ok().map(char::from);
                        if let Some(event) = letter.and_then(|l| taps.tap(&mut session, l)) {
                            player.handle(&event);
                        }
                    }
                }
            }
        }

        player.handle_all(&session.release_all());
        capture.stop()
    }
}

#[cfg(not(feature = "camera"))]
mod live {
    use super::*;

    const NO_CAMERA: &str = "Built without camera support, rebuild with `--features camera`";

    pub fn calibrate(_settings: &Settings) -> Result<Settings> {
        bail!(NO_CAMERA)
    }

    pub fn run(
        _settings: &Settings,
        _settings_path: &Path,
        _show_window: bool,
        _max_frames: Option<u64>,
    ) -> Result<()> {
        bail!(NO_CAMERA)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let settings = Settings::load(&args.settings).context("Failed to load settings")?;
    log::debug!("Skin range: {}", settings.skin_range);

    match args.command {
        Command::Run { no_window, frames } => {
            log::info!("Hand piano starting...");
            live::run(&settings, &args.settings, !no_window, frames).context("Camera piano error")
        }
        Command::Detect { image, mirror } => detect_image(&settings, &image, mirror),
        Command::Calibrate { image } => {
            calibrate(&settings, &args.settings, image.as_deref()).context("Calibration failed")
        }
        Command::Keys {
            slider,
            visible,
            scroll,
        } => play_keys(
            &settings,
            KeysOptions {
                slider,
                visible,
                scroll,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_command(args: &[&str]) -> Result<Command, clap::Error> {
        let argv = ["piano-client", "keys"].iter().chain(args);
        Args::try_parse_from(argv).map(|args| args.command)
    }

    #[test]
    fn test_keys_options_parse() {
        match keys_command(&["--slider", "0.25"]).unwrap() {
            Command::Keys {
                slider, visible, ..
            } => {
                assert_eq!(slider, Some(0.25));
                assert!(!visible);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(keys_command(&["--visible", "--scroll", "50"]).is_ok());
    }

    #[test]
    fn test_keys_rejects_ignored_combinations() {
        // The slider moves the piano overlay, which --visible hides
        let err = keys_command(&["--visible", "--slider", "0.25"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        // Scrolling only changes the letters when they follow the visible keys
        let err = keys_command(&["--scroll", "50"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
