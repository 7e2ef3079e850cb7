// SPDX-License-Identifier: MIT
//! Capture devices.
//!
//! A `Capture` is the blocking side of a camera: each `read` waits for the
//! next frame. The sensing pipeline never calls it directly; a
//! [`SourceReader`](crate::sampler::reader::SourceReader) drives it from a
//! dedicated thread and publishes only the latest frame.

pub mod replay;
pub mod synthetic;

use crate::config::DeviceConfig;
use crate::error::CaptureError;
use crate::frame::Frame;

pub use replay::ReplayCapture;
pub use synthetic::SyntheticCapture;

pub trait Capture: Send {
    /// Blocks until the device delivers a frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the device fails to deliver a frame.
    fn read(&mut self) -> Result<Frame, CaptureError>;

    /// Human readable device description for logs and recording headers.
    fn describe(&self) -> String;

    fn nominal_fps(&self) -> f64;
}

/// Opens the device described by `config`. Attempted once, never retried.
///
/// # Errors
///
/// Returns an error if the device cannot be opened.
pub fn open(config: &DeviceConfig) -> Result<Box<dyn Capture>, CaptureError> {
    match *config {
        DeviceConfig::Synthetic(ref syn) => Ok(Box::new(SyntheticCapture::new(syn.clone()))),
        DeviceConfig::Replay(ref replay) => Ok(Box::new(ReplayCapture::open(&replay.path)?)),
    }
}
