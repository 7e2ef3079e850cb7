// SPDX-License-Identifier: MIT
//! Output side of a session: the time-series file and per-camera recordings.

pub mod csv;
pub mod naming;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{SensorError, SinkError};
use crate::frame::Frame;
use crate::recording::format::{FILE_EXTENSION, RecordingMetadata};
use crate::recording::writer::RecordingWriter;
use crate::session::record::Record;

pub use csv::CsvSink;
pub use naming::next_session_index;

pub const TIME_SERIES_PREFIX: &str = "LightLog";
pub const TIME_SERIES_SUFFIX: &str = ".csv";

pub trait TimeSeriesSink: Send {
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    fn write_header(&mut self, columns: &[String]) -> Result<(), SinkError>;

    /// # Errors
    ///
    /// Returns an error if the row cannot be written.
    fn write_record(&mut self, record: &Record) -> Result<(), SinkError>;

    /// # Errors
    ///
    /// Returns an error if buffered rows cannot be flushed.
    fn finish(&mut self) -> Result<(), SinkError>;
}

pub trait RecordingSink: Send {
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// # Errors
    ///
    /// Returns an error if the recording cannot be finalized.
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Opens the sinks of one session.
pub trait SinkFactory {
    /// # Errors
    ///
    /// Returns `SinkOpen` if the file cannot be created.
    fn open_time_series(&mut self) -> Result<(Box<dyn TimeSeriesSink>, PathBuf), SensorError>;

    /// Opens one recording per entry of `cameras`, all sharing one session
    /// index.
    ///
    /// # Errors
    ///
    /// Returns `SinkOpen` if any file cannot be created.
    fn open_recordings(
        &mut self,
        cameras: &[RecordingMetadata],
    ) -> Result<Vec<(Box<dyn RecordingSink>, PathBuf)>, SensorError>;
}

/// Files under the configured data and video directories, numbered so that
/// a new session never overwrites an old one.
pub struct FileSinks {
    data_dir: PathBuf,
    video_dir: PathBuf,
}

impl FileSinks {
    #[must_use]
    pub fn new(data_dir: &Path, video_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            video_dir: video_dir.to_path_buf(),
        }
    }
}

fn open_error(path: &Path, source: impl Into<SinkError>) -> SensorError {
    SensorError::SinkOpen {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

fn recording_prefix(source_index: usize) -> String {
    format!("Cam{}_Recording", source_index + 1)
}

impl SinkFactory for FileSinks {
    fn open_time_series(&mut self) -> Result<(Box<dyn TimeSeriesSink>, PathBuf), SensorError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| open_error(&self.data_dir, e))?;
        let idx = next_session_index(&self.data_dir, TIME_SERIES_PREFIX, TIME_SERIES_SUFFIX)
            .map_err(|e| open_error(&self.data_dir, e))?;
        let path = self
            .data_dir
            .join(format!("{TIME_SERIES_PREFIX}{idx}{TIME_SERIES_SUFFIX}"));
        let sink = CsvSink::create(&path).map_err(|e| open_error(&path, e))?;
        info!(path = %path.display(), "time series opened");
        Ok((Box::new(sink), path))
    }

    fn open_recordings(
        &mut self,
        cameras: &[RecordingMetadata],
    ) -> Result<Vec<(Box<dyn RecordingSink>, PathBuf)>, SensorError> {
        std::fs::create_dir_all(&self.video_dir).map_err(|e| open_error(&self.video_dir, e))?;
        let suffix = format!(".{FILE_EXTENSION}");

        let mut idx = 1;
        for camera in cameras {
            let prefix = recording_prefix(camera.source_index);
            let next = next_session_index(&self.video_dir, &prefix, &suffix)
                .map_err(|e| open_error(&self.video_dir, e))?;
            idx = idx.max(next);
        }

        let mut sinks: Vec<(Box<dyn RecordingSink>, PathBuf)> = Vec::with_capacity(cameras.len());
        for camera in cameras {
            let path = self.video_dir.join(format!(
                "{}{idx}{suffix}",
                recording_prefix(camera.source_index)
            ));
            let writer = RecordingWriter::create(&path, camera).map_err(|e| open_error(&path, e))?;
            info!(source = camera.source_index, path = %path.display(), "recording opened");
            sinks.push((Box::new(writer), path));
        }
        Ok(sinks)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn camera(source_index: usize) -> RecordingMetadata {
        RecordingMetadata {
            source_index,
            device: "test".into(),
            nominal_fps: 30.0,
            recording_start: SystemTime::now(),
        }
    }

    #[test]
    fn sessions_get_increasing_indices() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        let video = dir.path().join("Videos");
        let mut sinks = FileSinks::new(&data, &video);

        let (mut first, first_path) = sinks.open_time_series().unwrap();
        first.finish().unwrap();
        let (_, second_path) = sinks.open_time_series().unwrap();
        assert_eq!(first_path, data.join("LightLog1.csv"));
        assert_eq!(second_path, data.join("LightLog2.csv"));
    }

    #[test]
    fn recordings_share_one_index() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Data");
        let video = dir.path().join("Videos");
        std::fs::create_dir_all(&video).unwrap();
        // camera 2 has an older, higher-numbered recording
        std::fs::write(video.join("Cam2_Recording4.camrec"), b"").unwrap();

        let mut sinks = FileSinks::new(&data, &video);
        let opened = sinks.open_recordings(&[camera(0), camera(1)]).unwrap();
        let paths: Vec<PathBuf> = opened.into_iter().map(|(_, p)| p).collect();
        assert_eq!(
            paths,
            vec![
                video.join("Cam1_Recording5.camrec"),
                video.join("Cam2_Recording5.camrec"),
            ]
        );
    }
}
