// SPDX-License-Identifier: MIT
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

mod capture;
mod config;
mod datasource;
mod error;
mod frame;
mod recording;
mod sampler;
mod session;
mod sink;
mod tui;

use std::fs::OpenOptions;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use num_format::{Locale, ToFormattedString};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::SensorError;
use crate::recording::reader::RecordingReader;
use crate::sampler::reader::SourceReader;
use crate::sampler::reduce::mean_intensity;
use crate::session::record::header_columns;
use crate::session::{Record, SessionController, SessionSettings, SessionStatus, SessionSummary};
use crate::sink::FileSinks;
use crate::tui::app::App;
use crate::tui::input::{Action, handle_key};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(10);
const HEADLESS_STATUS_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_CONFIG: &str = "camsense.toml";
const LOG_FILE: &str = "camsense.log";

type Controller = SessionController<SourceReader>;

#[derive(Parser)]
#[command(name = "camsense", about = "camsense: multi-camera light-change logger")]
struct Cli {
    /// Configuration file (defaults to ./camsense.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive control surface
    Live {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Record and sense without a UI, printing rows to stdout
    Run {
        /// Arm sensing without writing frame recordings
        #[arg(long)]
        no_record: bool,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Summarize a frame recording
    Inspect { path: PathBuf },
}

#[derive(Args)]
struct Overrides {
    /// Sensing duration in seconds, 0 for no limit
    #[arg(short, long)]
    duration: Option<f64>,
    /// Stop sensing after this many rows
    #[arg(short, long)]
    max_windows: Option<u64>,
    #[arg(long)]
    thresh_abs: Option<f64>,
    #[arg(long)]
    thresh_rel: Option<f64>,
}

impl Overrides {
    fn apply(&self, config: &mut Config) {
        if let Some(duration) = self.duration {
            config.session.duration_seconds = duration;
        }
        if let Some(max_windows) = self.max_windows {
            config.session.max_windows = Some(max_windows);
        }
        if let Some(abs) = self.thresh_abs {
            config.detector.thresh_abs = abs;
        }
        if let Some(rel) = self.thresh_rel {
            config.detector.thresh_rel = rel;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Live { overrides } => {
            let config = load_config(cli.config.as_deref(), &overrides)?;
            cmd_live(&config)
        }
        Commands::Run {
            no_record,
            overrides,
        } => {
            let config = load_config(cli.config.as_deref(), &overrides)?;
            cmd_run(&config, !no_record)
        }
        Commands::Inspect { path } => cmd_inspect(&path),
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let default_path = Path::new(DEFAULT_CONFIG);
    let mut config = match path {
        Some(p) => Config::load(p).with_context(|| format!("failed to load {}", p.display()))?,
        None if default_path.exists() => Config::load(default_path)
            .with_context(|| format!("failed to load {DEFAULT_CONFIG}"))?,
        None => Config::default(),
    };
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Logs go to stderr, or to `log_file` when the terminal belongs to the UI.
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn install_signal_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;
    Ok(shutdown)
}

/// Opens every configured camera. Only the primary is required.
fn open_cameras(config: &Config) -> Result<Vec<(usize, SourceReader)>> {
    let mut cameras = Vec::with_capacity(config.sources.len());
    for (index, source) in config.sources.iter().enumerate() {
        match SourceReader::open(index, source) {
            Ok(reader) => cameras.push((index, reader)),
            Err(err) if index == 0 => {
                return Err(err).context("primary camera unavailable, no session started");
            }
            Err(err) => warn!(source = index, error = %err, "camera unavailable, continuing without it"),
        }
    }
    Ok(cameras)
}

fn build_controller(config: &Config, record_frames: bool) -> Result<Controller> {
    let settings = SessionSettings {
        thresholds: config.thresholds(),
        window: config.session.window(),
        termination: config.session.termination(),
        flush_empty_final_window: config.session.flush_empty_final_window,
        record_frames,
    };
    let cameras = open_cameras(config)?;
    let sinks = FileSinks::new(&config.output.data_dir, &config.output.video_dir);
    Ok(SessionController::new(settings, cameras, Box::new(sinks)))
}

fn column_indices(status: &SessionStatus) -> Vec<usize> {
    status
        .cameras
        .iter()
        .filter(|c| c.alive)
        .map(|c| c.index)
        .collect()
}

fn report_abort(err: &anyhow::Error, controller: &Controller) {
    let rows = err
        .downcast_ref::<SensorError>()
        .and_then(SensorError::rows_written)
        .unwrap_or_else(|| controller.rows_written());
    eprintln!("Aborted after {rows} rows");
}

fn print_summary(summary: &SessionSummary) {
    eprintln!("Finished: {} rows written", summary.total_rows);
    for path in summary.time_series.iter().chain(&summary.recordings) {
        eprintln!("  {}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Terminal setup / teardown
// ---------------------------------------------------------------------------

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("failed to create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Live subcommand
// ---------------------------------------------------------------------------

fn cmd_live(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.output.data_dir).with_context(|| {
        format!("failed to create {}", config.output.data_dir.display())
    })?;
    init_logging(
        &config.logging.level,
        Some(&config.output.data_dir.join(LOG_FILE)),
    )?;
    let shutdown = install_signal_handler()?;
    let mut controller = build_controller(config, true)?;

    let mut terminal = setup_terminal()?;
    let mut app = App::new();
    let result = run_live_loop(
        &shutdown,
        &mut controller,
        &mut app,
        &mut terminal,
        config.session.poll_interval(),
    );

    let summary = controller.stop(Instant::now());
    restore_terminal(&mut terminal)?;

    if let Err(err) = result {
        report_abort(&err, &controller);
        return Err(err);
    }
    print_summary(&summary.context("failed to close session")?);
    Ok(())
}

fn run_live_loop(
    shutdown: &Arc<AtomicBool>,
    controller: &mut Controller,
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    poll_interval: Duration,
) -> Result<()> {
    let poll_timeout = EVENT_POLL_TIMEOUT.min(poll_interval);

    loop {
        if shutdown.load(Ordering::Relaxed) || app.should_quit {
            break;
        }

        if event::poll(poll_timeout).context("failed to poll events")?
            && let Event::Key(key) = event::read().context("failed to read event")?
            && key.kind == KeyEventKind::Press
        {
            match handle_key(key.code) {
                Action::StartRecording => {
                    controller.start_recording()?;
                }
                Action::StartSensing => {
                    let now = Instant::now();
                    if controller.start_sensing(now)? {
                        app.begin_run(column_indices(&controller.status(now)));
                    }
                }
                action => app.handle_action(action),
            }
        }

        let now = Instant::now();
        let tick = controller.tick(now);
        app.push_records(controller.drain_records());
        app.update_status(controller.status(now));
        tick?;

        terminal
            .draw(|f| app.render(f))
            .context("failed to draw frame")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Run (headless) subcommand
// ---------------------------------------------------------------------------

fn cmd_run(config: &Config, record_frames: bool) -> Result<()> {
    init_logging(&config.logging.level, None)?;
    let shutdown = install_signal_handler()?;
    let mut controller = build_controller(config, record_frames)?;
    let mut out = io::stdout().lock();

    let result = run_headless(
        &shutdown,
        &mut controller,
        &mut out,
        config.session.poll_interval(),
    );

    let summary = controller.stop(Instant::now());
    let flushed = print_records(&mut out, controller.drain_records());

    if let Err(err) = result {
        report_abort(&err, &controller);
        return Err(err);
    }
    flushed?;
    print_summary(&summary.context("failed to close session")?);
    Ok(())
}

fn run_headless(
    shutdown: &Arc<AtomicBool>,
    controller: &mut Controller,
    out: &mut impl Write,
    poll_interval: Duration,
) -> Result<()> {
    controller.start_recording()?;
    let start = Instant::now();
    controller.start_sensing(start)?;

    let columns = column_indices(&controller.status(start));
    writeln!(out, "{}", header_columns(&columns).join(",")).context("failed to write header")?;

    let mut last_status = start;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            eprintln!("\nInterrupted.");
            break;
        }

        let now = Instant::now();
        let tick = controller.tick(now);
        print_records(out, controller.drain_records())?;
        let report = tick?;

        for index in &report.dropped {
            eprintln!("Camera {} lost", index + 1);
        }
        if let Some(reason) = report.sensing_stopped {
            eprintln!("\nSensing stopped: {reason:?}");
            break;
        }

        if now.duration_since(last_status) >= HEADLESS_STATUS_INTERVAL {
            print_status(&controller.status(now));
            last_status = now;
        }

        std::thread::sleep(poll_interval);
    }

    Ok(())
}

fn print_records(out: &mut impl Write, records: Vec<Record>) -> Result<()> {
    for record in records {
        writeln!(out, "{}", record.to_csv_line()).context("failed to write row")?;
    }
    out.flush().context("failed to flush stdout")
}

fn print_status(status: &SessionStatus) {
    let secs = status.sensing_elapsed.map_or(0, |d| d.as_secs());
    let cameras: Vec<String> = status
        .cameras
        .iter()
        .map(|c| match (c.alive, c.brightness) {
            (false, _) => format!("Cam{} lost", c.index + 1),
            (true, Some(level)) => format!("Cam{} {level:.1}", c.index + 1),
            (true, None) => format!("Cam{} -", c.index + 1),
        })
        .collect();
    eprintln!(
        "  [{secs}s] {} rows, {}",
        status.rows_written,
        cameras.join(", ")
    );
}

// ---------------------------------------------------------------------------
// Inspect subcommand
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
struct BrightnessStats {
    min: f64,
    mean: f64,
    max: f64,
}

#[allow(clippy::cast_precision_loss)]
fn brightness_stats(levels: &[f64]) -> Option<BrightnessStats> {
    if levels.is_empty() {
        return None;
    }
    let min = levels.iter().copied().fold(f64::INFINITY, f64::min);
    let max = levels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = levels.iter().sum::<f64>() / levels.len() as f64;
    Some(BrightnessStats { min, mean, max })
}

#[allow(clippy::cast_precision_loss)]
fn cmd_inspect(path: &Path) -> Result<()> {
    let reader = RecordingReader::open(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let meta = reader.metadata();
    let started = meta
        .recording_start
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let duration_ns = reader.frames().last().map_or(0, |f| f.elapsed_ns);

    println!("Recording {}", path.display());
    println!("  camera:      Cam{}", meta.source_index + 1);
    println!("  device:      {}", meta.device);
    println!("  nominal fps: {:.1}", meta.nominal_fps);
    println!("  started:     {started} (unix seconds)");
    println!(
        "  frames:      {}",
        reader.frame_count().to_formatted_string(&Locale::en)
    );
    if let Some(first) = reader.frame_at(0) {
        println!(
            "  dimensions:  {}x{}",
            first.frame.width, first.frame.height
        );
    }
    println!("  duration:    {:.2}s", duration_ns as f64 / 1e9);

    let levels: Vec<f64> = reader
        .frames()
        .iter()
        .filter_map(|f| mean_intensity(&f.frame))
        .collect();
    match brightness_stats(&levels) {
        Some(stats) => println!(
            "  brightness:  min {:.1}, mean {:.1}, max {:.1}",
            stats.min, stats.mean, stats.max
        ),
        None => println!("  brightness:  no usable frames"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_stats_of_levels() {
        let stats = brightness_stats(&[10.0, 40.0, 25.0]).unwrap();
        assert_eq!(
            stats,
            BrightnessStats {
                min: 10.0,
                mean: 25.0,
                max: 40.0
            }
        );
        assert!(brightness_stats(&[]).is_none());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = Config::default();
        let overrides = Overrides {
            duration: Some(0.0),
            max_windows: Some(30),
            thresh_abs: None,
            thresh_rel: Some(0.25),
        };
        overrides.apply(&mut config);

        assert_eq!(config.session.termination().duration, None);
        assert_eq!(config.session.max_windows, Some(30));
        assert!((config.detector.thresh_rel - 0.25).abs() < f64::EPSILON);
        assert!((config.detector.thresh_abs - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn oversized_duration_override_is_rejected() {
        let mut config = Config::default();
        let overrides = Overrides {
            duration: Some(1e300),
            max_windows: None,
            thresh_abs: None,
            thresh_rel: None,
        };
        overrides.apply(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "camsense",
            "--config",
            "cams.toml",
            "run",
            "--no-record",
            "--max-windows",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cams.toml")));
        match cli.command {
            Commands::Run {
                no_record,
                overrides,
            } => {
                assert!(no_record);
                assert_eq!(overrides.max_windows, Some(5));
            }
            _ => panic!("expected run"),
        }
    }
}
