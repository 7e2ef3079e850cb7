// SPDX-License-Identifier: MIT
use crate::frame::Frame;

/// Mean intensity of every sample in the frame.
///
/// Returns `None` for empty or malformed frames so the caller can leave them
/// out of the running sum.
#[must_use]
pub fn mean_intensity(frame: &Frame) -> Option<f64> {
    if !frame.is_well_formed() {
        return None;
    }
    let sum: u64 = frame.data.iter().map(|&v| u64::from(v)).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / frame.data.len() as f64;
    Some(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_frame_mean_is_level() {
        let mean = mean_intensity(&Frame::uniform(8, 8, 200)).unwrap();
        assert!((mean - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mixed_frame_mean() {
        let frame = Frame::new(2, 2, vec![0, 10, 20, 30]);
        let mean = mean_intensity(&frame).unwrap();
        assert!((mean - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_or_malformed_frames_have_no_mean() {
        assert!(mean_intensity(&Frame::new(0, 0, Vec::new())).is_none());
        assert!(mean_intensity(&Frame::new(3, 3, vec![1, 2, 3])).is_none());
    }
}
