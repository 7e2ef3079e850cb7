// SPDX-License-Identifier: MIT
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use super::Capture;
use crate::error::CaptureError;
use crate::frame::Frame;
use crate::recording::format::{RecordedFrame, RecordingMetadata};
use crate::recording::reader::RecordingReader;

/// Plays a `.camrec` recording back as if it were a live camera, paced by the
/// recorded timestamps. Reaching the end of the recording is a read failure.
pub struct ReplayCapture {
    metadata: RecordingMetadata,
    frames: std::vec::IntoIter<RecordedFrame>,
    started: Option<Instant>,
}

impl ReplayCapture {
    /// # Errors
    ///
    /// Returns an error if the recording cannot be opened or decoded.
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let reader = RecordingReader::open(path)?;
        let (metadata, frames) = reader.into_frames();
        Ok(Self {
            metadata,
            frames: frames.into_iter(),
            started: None,
        })
    }
}

impl Capture for ReplayCapture {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        let recorded = self.frames.next().ok_or(CaptureError::EndOfStream)?;
        let started = *self.started.get_or_insert_with(Instant::now);
        let due = started + Duration::from_nanos(recorded.elapsed_ns);
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
        Ok(recorded.frame)
    }

    fn describe(&self) -> String {
        format!(
            "replay of camera {} ({})",
            self.metadata.source_index + 1,
            self.metadata.device
        )
    }

    fn nominal_fps(&self) -> f64 {
        self.metadata.nominal_fps
    }
}
