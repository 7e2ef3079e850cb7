// SPDX-License-Identifier: MIT
use std::path::PathBuf;

/// Failures surfaced by the sensing pipeline.
///
/// `NoFrameYet` and `SourceDead` are handled inside the tick. Every other
/// variant ends the session.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("camera {index} could not be opened: {reason}")]
    DeviceUnavailable { index: usize, reason: String },
    #[error("camera {index} has no frame yet")]
    NoFrameYet { index: usize },
    #[error("camera {index} stopped producing frames")]
    SourceDead { index: usize },
    #[error("primary camera stopped producing frames after {rows_written} rows")]
    PrimarySourceLost { rows_written: u64 },
    #[error("failed to write {what} ({rows_written} rows written): {source}")]
    SinkWrite {
        what: String,
        rows_written: u64,
        #[source]
        source: SinkError,
    },
    #[error("failed to open {}: {source}", path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: SinkError,
    },
}

/// A single failed read from a capture device.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("device disconnected: {0}")]
    Disconnected(String),
    #[error("end of stream")]
    EndOfStream,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Recording(#[from] RecordingError),
}

/// Write-side failure of a time-series or recording sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to encode: {0}")]
    Encode(#[from] postcard::Error),
    #[error("zstd: {0}")]
    Compress(std::io::Error),
    #[error("sink already closed")]
    Closed,
}

/// Read-side failure of a frame recording.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("failed to open recording {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read recording: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode recording: {0}")]
    Decode(#[from] postcard::Error),
    #[error("invalid magic bytes in recording file")]
    BadMagic,
    #[error("unsupported format version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },
}

impl SensorError {
    /// Rows successfully written before the failure, when the error knows it.
    #[must_use]
    pub fn rows_written(&self) -> Option<u64> {
        match *self {
            Self::PrimarySourceLost { rows_written } | Self::SinkWrite { rows_written, .. } => {
                Some(rows_written)
            }
            _ => None,
        }
    }
}
