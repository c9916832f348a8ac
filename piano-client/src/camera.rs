//! OpenCV webcam capture on a producer thread, plus the preview overlay.

use crate::frames::CapturedFrame;
use anyhow::{ensure, Context, Result};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use piano_core::DetectionZone;
use piano_hand_detector::Roi;
use piano_shared::HandReading;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Consecutive read failures before backing off to the long sleep
const MAX_QUICK_RETRIES: u32 = 5;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct Camera {
    capture: VideoCapture,
    width: i32,
    height: i32,
}

impl Camera {
    pub fn open(index: i32, width: u32, height: u32) -> Result<Self> {
        log::info!("Opening camera device {}...", index);
        let mut capture = VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32)
            .with_context(|| format!("Failed to create capture for device {}", index))?;
        ensure!(capture.is_opened()?, "Failed to open camera device {}", index);

        capture.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(width))?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(height))?;
        log::info!(
            "Camera opened: {}x{} at {} fps",
            capture.get(videoio::CAP_PROP_FRAME_WIDTH)?,
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?,
            capture.get(videoio::CAP_PROP_FPS)?
        );

        Ok(Self {
            capture,
            width: width as i32,
            height: height as i32,
        })
    }

    /// Read one frame: mirrored, scaled to the configured size, RGB.
    /// `Ok(None)` when the device returned nothing.
    pub fn read(&mut self) -> Result<Option<CapturedFrame>> {
        let mut raw = Mat::default();
        if !self.capture.read(&mut raw)? || raw.empty() {
            return Ok(None);
        }

        let mut mirrored = Mat::default();
        core::flip(&raw, &mut mirrored, 1)?;

        let mut resized = Mat::default();
        imgproc::resize(
            &mirrored,
            &mut resized,
            Size::new(self.width, self.height),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        Ok(Some(CapturedFrame {
            width: rgb.cols() as usize,
            height: rgb.rows() as usize,
            rgb: rgb.data_bytes()?.to_vec(),
        }))
    }
}

/// Capture frames on a background thread until `running` is cleared or the
/// receiver goes away. Frames are dropped while the consumer is busy.
pub fn spawn_capture(
    mut camera: Camera,
    sender: SyncSender<CapturedFrame>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        log::info!("Camera thread started");
        let mut errors = 0u32;
        let mut frame_count = 0u64;

        while running.load(Ordering::Relaxed) {
            let started = Instant::now();
            let frame = match camera.read() {
                Ok(Some(frame)) => frame,
                failed => {
                    errors += 1;
                    match failed {
                        Err(e) => {
                            log::warn!("Error capturing frame ({} errors): {:#}", errors, e)
                        }
                        _ => log::warn!("Camera returned no frame ({} errors)", errors),
                    }
                    thread::sleep(retry_pause(errors));
                    continue;
                }
            };
            errors = 0;
            frame_count += 1;
            if frame_count % 300 == 0 {
                log::debug!("Captured {} frames", frame_count);
            }

            match sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => log::trace!("Consumer busy, frame dropped"),
                Err(TrySendError::Disconnected(_)) => break,
            }

            if let Some(rest) = FRAME_INTERVAL.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }

        log::info!("Camera thread ending");
    })
}

/// Short pause for the first few failures, then back off
fn retry_pause(errors: u32) -> Duration {
    if errors > MAX_QUICK_RETRIES {
        Duration::from_secs(1)
    } else {
        Duration::from_millis(100)
    }
}

fn to_bgr_mat(frame: &CapturedFrame) -> Result<Mat> {
    let flat = Mat::from_slice(&frame.rgb)?;
    let rgb = flat.reshape(3, frame.height as i32)?.try_clone()?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

/// BGR preview image with the zone outline, fingertips and calibration box
pub fn annotate(
    frame: &CapturedFrame,
    zone: &DetectionZone,
    reading: Option<&HandReading>,
    calibration_box: Option<Roi>,
) -> Result<Mat> {
    let mut image = to_bgr_mat(frame)?;

    let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
    let red = Scalar::new(0.0, 0.0, 255.0, 0.0);
    let yellow = Scalar::new(0.0, 255.0, 255.0, 0.0);

    imgproc::rectangle(
        &mut image,
        Rect::new(
            zone.left() as i32,
            zone.top() as i32,
            zone.width() as i32,
            zone.height() as i32,
        ),
        green,
        2,
        imgproc::LINE_8,
        0,
    )?;

    if let Some(reading) = reading {
        for tip in &reading.fingertips {
            let (x, y) = (tip.position.x as i32, tip.position.y as i32);
            imgproc::rectangle(
                &mut image,
                Rect::new(x - 5, y - 5, 10, 10),
                red,
                -1,
                imgproc::LINE_8,
                0,
            )?;
        }
    }

    if let Some(roi) = calibration_box {
        imgproc::rectangle(
            &mut image,
            Rect::new(
                roi.x as i32,
                roi.y as i32,
                roi.width as i32,
                roi.height as i32,
            ),
            yellow,
            2,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::put_text(
            &mut image,
            "Place hand in box",
            Point::new(roi.x as i32, (roi.y as i32 - 10).max(15)),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.6,
            yellow,
            2,
            imgproc::LINE_8,
            false,
        )?;
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_pause_backs_off() {
        assert_eq!(retry_pause(1), Duration::from_millis(100));
        assert_eq!(retry_pause(MAX_QUICK_RETRIES), Duration::from_millis(100));
        assert_eq!(retry_pause(MAX_QUICK_RETRIES + 1), Duration::from_secs(1));
    }
}
