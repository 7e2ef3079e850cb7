// SPDX-License-Identifier: MIT
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::format::{EOF_MARKER, FORMAT_VERSION, FileHeader, MAGIC, RecordedFrame, RecordingMetadata};
use crate::error::RecordingError;

pub struct RecordingReader {
    metadata: RecordingMetadata,
    frames: Vec<RecordedFrame>,
}

impl RecordingReader {
    /// Opens a recording file, validates the header, and reads all frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, the header is invalid,
    /// or frame data is corrupted.
    pub fn open(path: &Path) -> Result<Self, RecordingError> {
        let file = File::open(path).map_err(|source| RecordingError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut decoder = zstd::Decoder::new(BufReader::new(file))?;

        let header = Self::read_header(&mut decoder)?;

        if header.magic != MAGIC {
            return Err(RecordingError::BadMagic);
        }
        if header.format_version != FORMAT_VERSION {
            return Err(RecordingError::UnsupportedVersion {
                found: header.format_version,
                expected: FORMAT_VERSION,
            });
        }

        let frames = Self::read_all_frames(&mut decoder)?;

        Ok(Self {
            metadata: header.metadata,
            frames,
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn frame_at(&self, index: usize) -> Option<&RecordedFrame> {
        self.frames.get(index)
    }

    #[must_use]
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> (RecordingMetadata, Vec<RecordedFrame>) {
        (self.metadata, self.frames)
    }

    fn read_header(reader: &mut impl Read) -> Result<FileHeader, RecordingError> {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;

        Ok(postcard::from_bytes(&data)?)
    }

    fn read_all_frames(reader: &mut impl Read) -> Result<Vec<RecordedFrame>, RecordingError> {
        let mut frames = Vec::new();
        let mut len_buf = [0u8; 4];

        loop {
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                // recorder killed before finish(): keep what made it to disk
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            if len_buf == EOF_MARKER {
                break;
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            let mut data = vec![0u8; len];
            reader.read_exact(&mut data)?;

            frames.push(postcard::from_bytes(&data)?);
        }

        Ok(frames)
    }
}
