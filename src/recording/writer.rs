// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use tracing::debug;

use super::format::{EOF_MARKER, FORMAT_VERSION, FileHeader, MAGIC, RecordedFrame, RecordingMetadata};
use crate::error::SinkError;
use crate::frame::Frame;
use crate::sink::RecordingSink;

pub struct RecordingWriter {
    encoder: Option<zstd::Encoder<'static, BufWriter<File>>>,
    started: Instant,
    frames_written: u64,
}

impl RecordingWriter {
    /// Creates a new recording file at `path` and writes the file header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or the header cannot be written.
    pub fn create(path: &Path, metadata: &RecordingMetadata) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        let buf_writer = BufWriter::new(file);
        let mut encoder = zstd::Encoder::new(buf_writer, 3).map_err(SinkError::Compress)?;

        let header = FileHeader {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            metadata: metadata.clone(),
        };
        write_record(&mut encoder, &postcard::to_stdvec(&header)?)?;

        Ok(Self {
            encoder: Some(encoder),
            started: Instant::now(),
            frames_written: 0,
        })
    }

}

impl RecordingSink for RecordingWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let encoder = self.encoder.as_mut().ok_or(SinkError::Closed)?;
        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ns = self.started.elapsed().as_nanos() as u64;
        let record = RecordedFrame {
            elapsed_ns,
            frame: frame.clone(),
        };
        write_record(encoder, &postcard::to_stdvec(&record)?)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Writes the EOF marker, finishes compression, and flushes the file.
    /// Closing twice is a no-op.
    fn finish(&mut self) -> Result<(), SinkError> {
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };
        encoder.write_all(&EOF_MARKER)?;
        let mut buf_writer = encoder.finish().map_err(SinkError::Compress)?;
        buf_writer.flush()?;
        debug!(frames = self.frames_written, "recording closed");
        Ok(())
    }
}

impl Drop for RecordingWriter {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

fn write_record(out: &mut impl Write, serialized: &[u8]) -> Result<(), SinkError> {
    #[allow(clippy::cast_possible_truncation)]
    let len = serialized.len() as u32;
    out.write_all(&len.to_le_bytes())?;
    out.write_all(serialized)?;
    Ok(())
}
