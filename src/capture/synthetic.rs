// SPDX-License-Identifier: MIT
use std::thread;
use std::time::{Duration, Instant};

use super::Capture;
use crate::config::SyntheticConfig;
use crate::error::CaptureError;
use crate::frame::Frame;

/// Test-pattern camera: a flat frame whose level alternates between `low`
/// and `high` every `period_secs`.
pub struct SyntheticCapture {
    config: SyntheticConfig,
    started: Instant,
    frame_interval: Duration,
    next_due: Instant,
}

impl SyntheticCapture {
    #[must_use]
    pub fn new(config: SyntheticConfig) -> Self {
        let now = Instant::now();
        let frame_interval = config.frame_interval();
        Self {
            config,
            started: now,
            frame_interval,
            next_due: now,
        }
    }

    /// Pixel level at `elapsed` seconds into the pattern.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn level_at(&self, elapsed: f64) -> u8 {
        let phase = (elapsed / self.config.period_secs).floor() as u64;
        let level = if phase % 2 == 0 {
            self.config.low
        } else {
            self.config.high
        };
        level.round().clamp(0.0, 255.0) as u8
    }
}

impl Capture for SyntheticCapture {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        let now = Instant::now();
        if self.next_due > now {
            thread::sleep(self.next_due - now);
        }
        self.next_due = self.next_due.checked_add(self.frame_interval).unwrap_or(now);

        let elapsed = self.started.elapsed().as_secs_f64();
        if let Some(limit) = self.config.fail_after_secs
            && elapsed >= limit
        {
            return Err(CaptureError::Disconnected(format!(
                "synthetic camera unplugged after {limit}s"
            )));
        }

        Ok(Frame::uniform(
            self.config.width,
            self.config.height,
            self.level_at(elapsed),
        ))
    }

    fn describe(&self) -> String {
        format!(
            "synthetic {}x{} @ {} fps",
            self.config.width, self.config.height, self.config.fps
        )
    }

    fn nominal_fps(&self) -> f64 {
        self.config.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyntheticConfig {
        SyntheticConfig {
            width: 8,
            height: 6,
            fps: 200.0,
            low: 40.0,
            high: 120.0,
            period_secs: 2.0,
            fail_after_secs: None,
        }
    }

    #[test]
    fn pattern_alternates_each_period() {
        let cam = SyntheticCapture::new(config());
        assert_eq!(cam.level_at(0.0), 40);
        assert_eq!(cam.level_at(1.9), 40);
        assert_eq!(cam.level_at(2.0), 120);
        assert_eq!(cam.level_at(3.5), 120);
        assert_eq!(cam.level_at(4.1), 40);
    }

    #[test]
    fn levels_are_clamped() {
        let cam = SyntheticCapture::new(SyntheticConfig {
            low: -20.0,
            high: 900.0,
            ..config()
        });
        assert_eq!(cam.level_at(0.5), 0);
        assert_eq!(cam.level_at(2.5), 255);
    }

    #[test]
    fn reads_frames_of_configured_size() {
        let mut cam = SyntheticCapture::new(config());
        let frame = cam.read().unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));
        assert!(frame.is_well_formed());
        assert_eq!(frame.data[0], 40);
        assert!(cam.describe().contains("8x6"));
    }

    #[test]
    fn unplugs_after_configured_time() {
        let mut cam = SyntheticCapture::new(SyntheticConfig {
            fail_after_secs: Some(0.0),
            ..config()
        });
        assert!(matches!(cam.read(), Err(CaptureError::Disconnected(_))));
    }
}
