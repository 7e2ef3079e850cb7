// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// A single 8-bit luma image as delivered by a capture device.
///
/// Pixel data is row-major, one byte per sample. A frame whose buffer does
/// not match `width * height` is malformed; consumers must check with
/// [`Frame::is_well_formed`] rather than trusting the dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Frame filled with a single intensity.
    #[must_use]
    pub fn uniform(width: u32, height: u32, level: u8) -> Self {
        let len = width as usize * height as usize;
        Self::new(width, height, vec![level; len])
    }

    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.sample_count() > 0 && self.data.len() == self.sample_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_frame_is_well_formed() {
        let frame = Frame::uniform(4, 3, 17);
        assert_eq!(frame.sample_count(), 12);
        assert_eq!(frame.data.len(), 12);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn mismatched_buffer_is_malformed() {
        let frame = Frame::new(4, 4, vec![0; 10]);
        assert!(!frame.is_well_formed());
        assert!(!Frame::new(0, 0, Vec::new()).is_well_formed());
    }
}
