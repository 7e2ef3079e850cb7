// SPDX-License-Identifier: MIT
use std::sync::Arc;

use crate::error::SensorError;
use crate::frame::Frame;

/// Non-blocking view of a camera: whatever frame it last delivered.
///
/// The same frame may be returned by any number of consecutive calls when
/// the camera is slower than the caller.
pub trait FrameFeed {
    /// # Errors
    ///
    /// `NoFrameYet` before the first frame arrives, `SourceDead` once the
    /// camera has failed.
    fn latest(&self) -> Result<Arc<Frame>, SensorError>;

    fn frames_acquired(&self) -> u64;

    fn describe(&self) -> String;

    fn nominal_fps(&self) -> f64;

    /// Stops acquisition and releases the device before returning.
    fn close(&mut self);
}
