// SPDX-License-Identifier: MIT
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capture::{self, Capture};
use crate::config::SourceConfig;
use crate::datasource::FrameFeed;
use crate::error::SensorError;
use crate::frame::Frame;

const READ_RETRY_DELAY: Duration = Duration::from_millis(5);

#[derive(Default)]
struct Slot {
    frame: Option<Arc<Frame>>,
    acquired: u64,
}

/// Owns one camera and a thread that keeps reading from it.
///
/// Only the most recent frame is kept. Once the camera fails more than its
/// tolerance allows, the reader marks itself dead and the thread exits; it
/// is never restarted.
pub struct SourceReader {
    index: usize,
    description: String,
    nominal_fps: f64,
    slot: Arc<Mutex<Slot>>,
    alive: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SourceReader {
    /// Opens the configured device and starts its acquisition thread.
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if the device cannot be opened.
    pub fn open(index: usize, config: &SourceConfig) -> Result<Self, SensorError> {
        let capture =
            capture::open(&config.device).map_err(|e| SensorError::DeviceUnavailable {
                index,
                reason: e.to_string(),
            })?;
        Self::spawn(index, capture, config.failure_tolerance)
    }

    /// Starts an acquisition thread over an already opened device.
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if the thread cannot be spawned.
    pub fn spawn(
        index: usize,
        mut capture: Box<dyn Capture>,
        failure_tolerance: u32,
    ) -> Result<Self, SensorError> {
        let description = capture.describe();
        let nominal_fps = capture.nominal_fps();
        let slot = Arc::new(Mutex::new(Slot::default()));
        let alive = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(AtomicBool::new(false));

        let slot_clone = Arc::clone(&slot);
        let alive_clone = Arc::clone(&alive);
        let shutdown_clone = Arc::clone(&shutdown);
        let tolerance = failure_tolerance.max(1);

        let handle = thread::Builder::new()
            .name(format!("source-{index}"))
            .spawn(move || {
                let mut failures = 0u32;
                while !shutdown_clone.load(Ordering::Relaxed) {
                    match capture.read() {
                        Ok(frame) => {
                            failures = 0;
                            if let Ok(mut guard) = slot_clone.lock() {
                                guard.frame = Some(Arc::new(frame));
                                guard.acquired += 1;
                            }
                        }
                        Err(e) => {
                            failures = failures.saturating_add(1);
                            if failures >= tolerance {
                                warn!(source = index, error = %e, "camera read failed, marking unavailable");
                                alive_clone.store(false, Ordering::Release);
                                break;
                            }
                            debug!(source = index, error = %e, failures, "camera read failed, retrying");
                            thread::sleep(READ_RETRY_DELAY);
                        }
                    }
                }
                drop(capture);
            })
            .map_err(|e| SensorError::DeviceUnavailable {
                index,
                reason: format!("failed to spawn acquisition thread: {e}"),
            })?;

        info!(source = index, device = %description, "camera opened");

        Ok(Self {
            index,
            description,
            nominal_fps,
            slot,
            alive,
            shutdown,
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl FrameFeed for SourceReader {
    fn latest(&self) -> Result<Arc<Frame>, SensorError> {
        if !self.is_alive() {
            return Err(SensorError::SourceDead { index: self.index });
        }
        let guard = self
            .slot
            .lock()
            .map_err(|_| SensorError::SourceDead { index: self.index })?;
        guard
            .frame
            .as_ref()
            .map(Arc::clone)
            .ok_or(SensorError::NoFrameYet { index: self.index })
    }

    fn frames_acquired(&self) -> u64 {
        self.slot.lock().map_or(0, |guard| guard.acquired)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn nominal_fps(&self) -> f64 {
        self.nominal_fps
    }

    fn close(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!(source = self.index, "camera released");
        }
    }
}

impl Drop for SourceReader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Instant;

    use super::*;
    use crate::error::CaptureError;

    /// Delivers a fixed list of frames, then fails forever.
    struct ScriptedCapture {
        frames: VecDeque<Frame>,
        interval: Duration,
    }

    impl Capture for ScriptedCapture {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            thread::sleep(self.interval);
            self.frames.pop_front().ok_or(CaptureError::EndOfStream)
        }

        fn describe(&self) -> String {
            "scripted".into()
        }

        fn nominal_fps(&self) -> f64 {
            100.0
        }
    }

    /// Never fails; counts how many frames it produced.
    struct EndlessCapture;

    impl Capture for EndlessCapture {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            thread::sleep(Duration::from_millis(1));
            Ok(Frame::uniform(2, 2, 77))
        }

        fn describe(&self) -> String {
            "endless".into()
        }

        fn nominal_fps(&self) -> f64 {
            1000.0
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn no_frame_before_first_read() {
        let capture = ScriptedCapture {
            frames: VecDeque::from(vec![Frame::uniform(2, 2, 1)]),
            interval: Duration::from_millis(300),
        };
        let mut reader = SourceReader::spawn(3, Box::new(capture), 1).unwrap();
        assert!(matches!(
            reader.latest(),
            Err(SensorError::NoFrameYet { index: 3 })
        ));
        reader.close();
    }

    #[test]
    fn latest_frame_wins_then_source_dies() {
        let capture = ScriptedCapture {
            frames: (0..3u8).map(|i| Frame::uniform(2, 2, i)).collect(),
            interval: Duration::from_millis(1),
        };
        let mut reader = SourceReader::spawn(1, Box::new(capture), 1).unwrap();

        assert!(wait_until(|| !reader.is_alive()));
        assert!(matches!(
            reader.latest(),
            Err(SensorError::SourceDead { index: 1 })
        ));
        assert_eq!(reader.frames_acquired(), 3);
        reader.close();
    }

    #[test]
    fn latest_does_not_consume_the_frame() {
        let capture = ScriptedCapture {
            frames: VecDeque::from(vec![Frame::uniform(2, 2, 42)]),
            interval: Duration::from_millis(1),
        };
        // generous tolerance so the source stays alive after its only frame
        let mut reader = SourceReader::spawn(0, Box::new(capture), u32::MAX).unwrap();

        assert!(wait_until(|| reader.latest().is_ok()));
        let a = reader.latest().unwrap();
        let b = reader.latest().unwrap();
        assert_eq!(a.data, vec![42; 4]);
        assert!(Arc::ptr_eq(&a, &b));
        reader.close();
    }

    #[test]
    fn close_joins_a_running_thread() {
        let mut reader = SourceReader::spawn(0, Box::new(EndlessCapture), 1).unwrap();
        assert!(wait_until(|| reader.frames_acquired() > 2));
        reader.close();
        let after_close = reader.frames_acquired();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(reader.frames_acquired(), after_close);
        assert!(reader.is_alive());
        // closing twice is harmless
        reader.close();
    }

    #[test]
    fn open_reports_unavailable_device() {
        let config = SourceConfig {
            device: crate::config::DeviceConfig::Replay(crate::config::ReplayConfig {
                path: "/nonexistent/Cam1_Recording1.camrec".into(),
            }),
            failure_tolerance: 1,
        };
        assert!(matches!(
            SourceReader::open(0, &config),
            Err(SensorError::DeviceUnavailable { index: 0, .. })
        ));
    }
}
