// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use tracing::{error, info, warn};

use super::record::{Cell, Record, header_columns};
use crate::config::Termination;
use crate::datasource::FrameFeed;
use crate::error::{SensorError, SinkError};
use crate::recording::format::RecordingMetadata;
use crate::sampler::detect::{ChangeDetector, Thresholds};
use crate::sampler::reduce::mean_intensity;
use crate::sampler::window::{Window, WindowClock};
use crate::sink::{RecordingSink, SinkFactory, TimeSeriesSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    RecordingOnly,
    SensingActive,
    Terminated,
}

impl SessionState {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::RecordingOnly => "RECORDING",
            Self::SensingActive => "SENSING",
            Self::Terminated => "STOPPED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    DurationReached,
    WindowCapReached,
    StopSignal,
    PrimarySourceLost,
}

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub thresholds: Thresholds,
    pub window: Duration,
    pub termination: Termination,
    pub flush_empty_final_window: bool,
    /// When false, recording is a state only and no frames are persisted.
    pub record_frames: bool,
}

/// What happened during one tick besides emitted rows.
#[derive(Debug, Default)]
pub struct TickReport {
    pub sensing_stopped: Option<StopReason>,
    pub dropped: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct CameraStatus {
    pub index: usize,
    pub description: String,
    pub alive: bool,
    pub frames_acquired: u64,
    pub frame_size: Option<(u32, u32)>,
    pub brightness: Option<f64>,
    /// Samples taken so far in the open window.
    pub window_samples: u64,
    /// Average of the last non-empty window.
    pub baseline: Option<f64>,
    pub last_cell: Option<Cell>,
    pub recording: bool,
}

#[derive(Clone, Debug)]
pub struct SessionStatus {
    pub state: SessionState,
    pub rows_written: u64,
    pub total_rows: u64,
    pub sensing_elapsed: Option<Duration>,
    pub time_series: Option<PathBuf>,
    pub cameras: Vec<CameraStatus>,
}

#[derive(Clone, Debug, Default)]
pub struct SessionSummary {
    pub total_rows: u64,
    pub time_series: Vec<PathBuf>,
    pub recordings: Vec<PathBuf>,
}

struct Camera<F> {
    index: usize,
    feed: F,
    alive: bool,
    window: Window,
    detector: ChangeDetector,
    recording: Option<Box<dyn RecordingSink>>,
    frame_size: Option<(u32, u32)>,
    brightness: Option<f64>,
    last_cell: Option<Cell>,
}

struct Sensing {
    clock: WindowClock,
    sink: Box<dyn TimeSeriesSink>,
    path: PathBuf,
    /// Positions in `cameras` that own a column, fixed at sensing start.
    columns: Vec<usize>,
    rows_written: u64,
}

/// Drives the cameras through recording and sensing.
///
/// Camera position 0 is the primary camera; losing it ends the session.
/// All timing comes from the `now` passed to each call.
pub struct SessionController<F: FrameFeed> {
    settings: SessionSettings,
    state: SessionState,
    cameras: Vec<Camera<F>>,
    sinks: Box<dyn SinkFactory>,
    sensing: Option<Sensing>,
    last_rows_written: u64,
    outbox: VecDeque<Record>,
    summary: SessionSummary,
}

impl<F: FrameFeed> SessionController<F> {
    /// `feeds` pairs each opened camera with its configured index, primary
    /// first.
    #[must_use]
    pub fn new(
        settings: SessionSettings,
        feeds: Vec<(usize, F)>,
        sinks: Box<dyn SinkFactory>,
    ) -> Self {
        let cameras = feeds
            .into_iter()
            .map(|(index, feed)| Camera {
                index,
                feed,
                alive: true,
                window: Window::new(),
                detector: ChangeDetector::new(settings.thresholds),
                recording: None,
                frame_size: None,
                brightness: None,
                last_cell: None,
            })
            .collect();
        Self {
            settings,
            state: SessionState::Idle,
            cameras,
            sinks,
            sensing: None,
            last_rows_written: 0,
            outbox: VecDeque::new(),
            summary: SessionSummary::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Rows written by the current sensing run, or by the last one.
    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.sensing
            .as_ref()
            .map_or(self.last_rows_written, |s| s.rows_written)
    }

    /// Rows emitted since the previous call, oldest first.
    pub fn drain_records(&mut self) -> Vec<Record> {
        self.outbox.drain(..).collect()
    }

    /// Opens one recording per live camera. Ignored unless idle.
    ///
    /// # Errors
    ///
    /// Returns `SinkOpen` if a recording cannot be created.
    pub fn start_recording(&mut self) -> Result<bool, SensorError> {
        if self.state != SessionState::Idle {
            return Ok(false);
        }

        if self.settings.record_frames {
            let cameras: Vec<RecordingMetadata> = self
                .cameras
                .iter()
                .filter(|c| c.alive)
                .map(|c| RecordingMetadata {
                    source_index: c.index,
                    device: c.feed.describe(),
                    nominal_fps: c.feed.nominal_fps(),
                    recording_start: SystemTime::now(),
                })
                .collect();
            let mut opened = self.sinks.open_recordings(&cameras)?.into_iter();
            for cam in self.cameras.iter_mut().filter(|c| c.alive) {
                if let Some((sink, path)) = opened.next() {
                    cam.recording = Some(sink);
                    self.summary.recordings.push(path);
                }
            }
        }

        self.state = SessionState::RecordingOnly;
        info!(persist = self.settings.record_frames, "recording started");
        Ok(true)
    }

    /// Opens a fresh time series and starts the window clock at `now`.
    /// Ignored unless recording and not already sensing.
    ///
    /// # Errors
    ///
    /// Returns `SinkOpen` or `SinkWrite` if the time series cannot be
    /// created; a failed header write ends the session.
    pub fn start_sensing(&mut self, now: Instant) -> Result<bool, SensorError> {
        if self.state != SessionState::RecordingOnly {
            return Ok(false);
        }

        let (mut sink, path) = self.sinks.open_time_series()?;
        let columns: Vec<usize> = (0..self.cameras.len())
            .filter(|&pos| self.cameras[pos].alive)
            .collect();
        let indices: Vec<usize> = columns.iter().map(|&pos| self.cameras[pos].index).collect();

        if let Err(source) = sink.write_header(&header_columns(&indices)) {
            return Err(self.fail(SensorError::SinkWrite {
                what: format!("header of {}", path.display()),
                rows_written: 0,
                source,
            }));
        }

        for cam in &mut self.cameras {
            cam.window = Window::new();
            cam.detector.reset();
            cam.last_cell = None;
        }

        info!(path = %path.display(), cameras = indices.len(), "sensing started");
        self.summary.time_series.push(path.clone());
        self.sensing = Some(Sensing {
            clock: WindowClock::new(now, self.settings.window),
            sink,
            path,
            columns,
            rows_written: 0,
        });
        self.state = SessionState::SensingActive;
        Ok(true)
    }

    /// One pass of the control loop: closes every window whose boundary has
    /// passed, then polls each live camera once.
    ///
    /// # Errors
    ///
    /// Returns `PrimarySourceLost` or `SinkWrite`; either leaves the session
    /// terminated with all cameras released.
    pub fn tick(&mut self, now: Instant) -> Result<TickReport, SensorError> {
        let mut report = TickReport::default();
        if self.state == SessionState::Terminated {
            return Ok(report);
        }

        report.sensing_stopped = self.roll_due_windows(now)?;
        self.poll_cameras(&mut report)?;
        Ok(report)
    }

    /// Ends the session: closes due and partial windows, finishes every sink
    /// and joins every camera. Calling it again returns the same summary.
    ///
    /// # Errors
    ///
    /// Returns `SinkWrite` if a final row or recording cannot be written.
    pub fn stop(&mut self, now: Instant) -> Result<SessionSummary, SensorError> {
        if self.state == SessionState::Terminated {
            return Ok(self.summary.clone());
        }

        self.roll_due_windows(now)?;
        if self.sensing.is_some() {
            self.stop_sensing(StopReason::StopSignal, self.settings.flush_empty_final_window)?;
        }

        let mut failed = None;
        for cam in &mut self.cameras {
            if let Some(mut recording) = cam.recording.take()
                && let Err(source) = recording.finish()
                && failed.is_none()
            {
                failed = Some((cam.index, source));
            }
            cam.feed.close();
        }
        self.state = SessionState::Terminated;

        if let Some((index, source)) = failed {
            return Err(SensorError::SinkWrite {
                what: format!("recording of camera {}", index + 1),
                rows_written: self.last_rows_written,
                source,
            });
        }

        info!(rows = self.summary.total_rows, "session stopped");
        Ok(self.summary.clone())
    }

    #[must_use]
    pub fn status(&self, now: Instant) -> SessionStatus {
        SessionStatus {
            state: self.state,
            rows_written: self.rows_written(),
            total_rows: self.summary.total_rows,
            sensing_elapsed: self.sensing.as_ref().map(|s| s.clock.elapsed(now)),
            time_series: self.sensing.as_ref().map(|s| s.path.clone()),
            cameras: self
                .cameras
                .iter()
                .map(|c| CameraStatus {
                    index: c.index,
                    description: c.feed.describe(),
                    alive: c.alive,
                    frames_acquired: c.feed.frames_acquired(),
                    frame_size: c.frame_size,
                    brightness: c.brightness,
                    window_samples: c.window.count(),
                    baseline: c.detector.baseline(),
                    last_cell: c.last_cell,
                    recording: c.recording.is_some(),
                })
                .collect(),
        }
    }

    fn roll_due_windows(&mut self, now: Instant) -> Result<Option<StopReason>, SensorError> {
        let due = match self.sensing.as_mut() {
            Some(sensing) => sensing.clock.due(now),
            None => return Ok(None),
        };

        for _ in 0..due {
            if self.cap_reached() {
                break;
            }
            self.emit()?;
        }

        if self.cap_reached() {
            self.stop_sensing(StopReason::WindowCapReached, false)?;
            return Ok(Some(StopReason::WindowCapReached));
        }
        if self.duration_reached(now) {
            self.stop_sensing(StopReason::DurationReached, false)?;
            return Ok(Some(StopReason::DurationReached));
        }
        Ok(None)
    }

    fn poll_cameras(&mut self, report: &mut TickReport) -> Result<(), SensorError> {
        let sensing = self.state == SessionState::SensingActive;

        for pos in 0..self.cameras.len() {
            if !self.cameras[pos].alive {
                continue;
            }

            match self.cameras[pos].feed.latest() {
                Ok(frame) => {
                    let cam = &mut self.cameras[pos];
                    let index = cam.index;
                    let brightness = mean_intensity(&frame);
                    cam.frame_size = Some((frame.width, frame.height));
                    if brightness.is_some() {
                        cam.brightness = brightness;
                    }
                    if sensing && let Some(value) = brightness {
                        cam.window.accumulate(value);
                    }
                    if let Some(recording) = cam.recording.as_mut()
                        && let Err(source) = recording.write_frame(&frame)
                    {
                        return Err(self.fail(SensorError::SinkWrite {
                            what: format!("recording of camera {}", index + 1),
                            rows_written: self.rows_written(),
                            source,
                        }));
                    }
                }
                Err(SensorError::NoFrameYet { .. }) => {}
                Err(_) => self.drop_camera(pos, report)?,
            }
        }
        Ok(())
    }

    fn drop_camera(&mut self, pos: usize, report: &mut TickReport) -> Result<(), SensorError> {
        let index = self.cameras[pos].index;
        report.dropped.push(index);

        if pos == 0 {
            error!(source = index, "primary camera lost, ending session");
            // the primary's partial window is still classified in the final row
            if self.sensing.is_some() {
                self.stop_sensing(
                    StopReason::PrimarySourceLost,
                    self.settings.flush_empty_final_window,
                )?;
                report.sensing_stopped = Some(StopReason::PrimarySourceLost);
            }
            let cam = &mut self.cameras[pos];
            cam.alive = false;
            cam.brightness = None;
            return Err(self.fail(SensorError::PrimarySourceLost {
                rows_written: self.rows_written(),
            }));
        }

        let cam = &mut self.cameras[pos];
        cam.alive = false;
        cam.window = Window::new();
        cam.brightness = None;
        let finished = cam.recording.take().map(|mut r| r.finish());
        cam.feed.close();

        warn!(source = index, "camera lost, continuing without it");
        if let Some(Err(source)) = finished {
            return Err(self.fail(SensorError::SinkWrite {
                what: format!("recording of camera {}", index + 1),
                rows_written: self.rows_written(),
                source,
            }));
        }
        Ok(())
    }

    /// Closes the current window for every column and writes the row.
    fn emit(&mut self) -> Result<(), SensorError> {
        let Some(sensing) = self.sensing.as_mut() else {
            return Ok(());
        };
        match emit_row(sensing, &mut self.cameras) {
            Ok(record) => {
                self.summary.total_rows += 1;
                self.outbox.push_back(record);
                Ok(())
            }
            Err(source) => {
                let rows_written = sensing.rows_written;
                let what = sensing.path.display().to_string();
                Err(self.fail(SensorError::SinkWrite {
                    what,
                    rows_written,
                    source,
                }))
            }
        }
    }

    fn stop_sensing(&mut self, reason: StopReason, allow_empty: bool) -> Result<(), SensorError> {
        if self.sensing.is_none() {
            return Ok(());
        }

        if (self.has_pending_samples() || allow_empty) && !self.cap_reached() {
            self.emit()?;
        }

        let Some(mut sensing) = self.sensing.take() else {
            return Ok(());
        };
        self.last_rows_written = sensing.rows_written;
        if let Err(source) = sensing.sink.finish() {
            return Err(self.fail(SensorError::SinkWrite {
                what: sensing.path.display().to_string(),
                rows_written: sensing.rows_written,
                source,
            }));
        }

        self.state = SessionState::RecordingOnly;
        info!(
            reason = ?reason,
            rows = sensing.rows_written,
            path = %sensing.path.display(),
            "sensing stopped"
        );
        Ok(())
    }

    fn has_pending_samples(&self) -> bool {
        self.sensing.as_ref().is_some_and(|s| {
            s.columns
                .iter()
                .any(|&pos| self.cameras[pos].alive && !self.cameras[pos].window.is_empty())
        })
    }

    fn cap_reached(&self) -> bool {
        match (self.sensing.as_ref(), self.settings.termination.max_windows) {
            (Some(sensing), Some(cap)) => sensing.rows_written >= cap,
            _ => false,
        }
    }

    fn duration_reached(&self, now: Instant) -> bool {
        match (self.sensing.as_ref(), self.settings.termination.duration) {
            (Some(sensing), Some(limit)) => sensing.clock.elapsed(now) >= limit,
            _ => false,
        }
    }

    /// Best-effort teardown after a fatal error.
    fn fail(&mut self, err: SensorError) -> SensorError {
        if let Some(mut sensing) = self.sensing.take() {
            self.last_rows_written = sensing.rows_written;
            let _ = sensing.sink.finish();
        }
        for cam in &mut self.cameras {
            if let Some(mut recording) = cam.recording.take() {
                let _ = recording.finish();
            }
            cam.feed.close();
        }
        self.state = SessionState::Terminated;
        error!(error = %err, rows = self.last_rows_written, "session aborted");
        err
    }
}

fn emit_row<F: FrameFeed>(
    sensing: &mut Sensing,
    cameras: &mut [Camera<F>],
) -> Result<Record, SinkError> {
    let cells = sensing
        .columns
        .iter()
        .map(|&pos| {
            let cam = &mut cameras[pos];
            let cell = if cam.alive {
                Cell::from(cam.detector.observe(cam.window.rollover()))
            } else {
                Cell::Dropped
            };
            cam.last_cell = Some(cell);
            cell
        })
        .collect();

    let record = Record {
        window_index: sensing.rows_written,
        cells,
    };
    sensing.sink.write_record(&record)?;
    sensing.rows_written += 1;
    Ok(record)
}
