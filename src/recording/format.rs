// SPDX-License-Identifier: MIT
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

pub const MAGIC: [u8; 4] = *b"CSRC";
pub const FORMAT_VERSION: u8 = 1;
pub const EOF_MARKER: [u8; 4] = *b"CEOF";
pub const FILE_EXTENSION: &str = "camrec";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub source_index: usize,
    pub device: String,
    pub nominal_fps: f64,
    pub recording_start: SystemTime,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub format_version: u8,
    pub metadata: RecordingMetadata,
}

/// One frame as written by the recorder, stamped relative to recording start.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RecordedFrame {
    pub elapsed_ns: u64,
    pub frame: Frame,
}
