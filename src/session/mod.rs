// SPDX-License-Identifier: MIT
//! Session lifecycle: recording, sensing and the rows they produce.

pub mod controller;
pub mod record;

pub use controller::{
    CameraStatus, SessionController, SessionSettings, SessionState, SessionStatus, SessionSummary,
};
pub use record::{Cell, Record};
