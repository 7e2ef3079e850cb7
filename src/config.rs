// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::sampler::detect::Thresholds;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_thresh_abs")]
    pub thresh_abs: f64,
    #[serde(default = "default_thresh_rel")]
    pub thresh_rel: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,
    /// Zero disables the duration limit.
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: f64,
    #[serde(default)]
    pub max_windows: Option<u64>,
    #[serde(default)]
    pub flush_empty_final_window: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub device: DeviceConfig,
    /// Consecutive failed reads tolerated before the camera is declared dead.
    #[serde(default = "default_failure_tolerance")]
    pub failure_tolerance: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceConfig {
    Synthetic(SyntheticConfig),
    Replay(ReplayConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_low")]
    pub low: f64,
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_period_secs")]
    pub period_secs: f64,
    #[serde(default)]
    pub fail_after_secs: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    pub path: PathBuf,
}

/// When sensing stops on its own. Both limits may be active at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Termination {
    pub duration: Option<Duration>,
    pub max_windows: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detector;
        if !non_negative(d.thresh_abs) || !non_negative(d.thresh_rel) {
            return Err(ConfigError::Invalid(
                "detector thresholds must be non-negative".into(),
            ));
        }
        if !positive(d.epsilon) {
            return Err(ConfigError::Invalid("detector.epsilon must be positive".into()));
        }

        let s = &self.session;
        if !positive(s.window_seconds) {
            return Err(ConfigError::Invalid(
                "session.window_seconds must be positive".into(),
            ));
        }
        if !non_negative(s.duration_seconds) {
            return Err(ConfigError::Invalid(
                "session.duration_seconds must be zero or positive".into(),
            ));
        }
        seconds(s.window_seconds, "session.window_seconds")?;
        seconds(s.duration_seconds, "session.duration_seconds")?;
        if s.max_windows == Some(0) {
            return Err(ConfigError::Invalid(
                "session.max_windows must be at least 1".into(),
            ));
        }
        if s.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "session.poll_interval_ms must be at least 1".into(),
            ));
        }

        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source is required".into()));
        }
        for (i, source) in self.sources.iter().enumerate() {
            if source.failure_tolerance == 0 {
                return Err(ConfigError::Invalid(format!(
                    "sources[{i}].failure_tolerance must be at least 1"
                )));
            }
            if let DeviceConfig::Synthetic(ref syn) = source.device {
                if syn.width == 0 || syn.height == 0 {
                    return Err(ConfigError::Invalid(format!(
                        "sources[{i}] frame size must be non-zero"
                    )));
                }
                if !positive(syn.fps) || !positive(syn.period_secs) {
                    return Err(ConfigError::Invalid(format!(
                        "sources[{i}] fps and period_secs must be positive"
                    )));
                }
                seconds(1.0 / syn.fps, &format!("sources[{i}] frame interval"))?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            abs: self.detector.thresh_abs,
            rel: self.detector.thresh_rel,
            epsilon: self.detector.epsilon,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::try_from_secs_f64(self.window_seconds).unwrap_or(Duration::MAX)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn termination(&self) -> Termination {
        Termination {
            duration: (self.duration_seconds > 0.0).then(|| {
                Duration::try_from_secs_f64(self.duration_seconds).unwrap_or(Duration::MAX)
            }),
            max_windows: self.max_windows,
        }
    }
}

impl SyntheticConfig {
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.fps).unwrap_or(Duration::MAX)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            session: SessionConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            sources: default_sources(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            thresh_abs: default_thresh_abs(),
            thresh_rel: default_thresh_rel(),
            epsilon: default_epsilon(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            duration_seconds: default_duration_seconds(),
            max_windows: None,
            flush_empty_final_window: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            video_dir: default_video_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            low: default_low(),
            high: default_high(),
            period_secs: default_period_secs(),
            fail_after_secs: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn seconds(v: f64, what: &str) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(v)
        .map_err(|e| ConfigError::Invalid(format!("{what} out of range: {e}")))
}

// Default value functions
fn default_thresh_abs() -> f64 {
    8.0
}
fn default_thresh_rel() -> f64 {
    0.1
}
fn default_epsilon() -> f64 {
    1e-6
}
fn default_window_seconds() -> f64 {
    1.0
}
fn default_duration_seconds() -> f64 {
    120.0
}
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("Data")
}
fn default_video_dir() -> PathBuf {
    PathBuf::from("Videos")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_failure_tolerance() -> u32 {
    1
}
fn default_width() -> u32 {
    64
}
fn default_height() -> u32 {
    48
}
fn default_fps() -> f64 {
    30.0
}
fn default_low() -> f64 {
    40.0
}
fn default_high() -> f64 {
    120.0
}
fn default_period_secs() -> f64 {
    5.0
}
fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig {
        device: DeviceConfig::Synthetic(SyntheticConfig::default()),
        failure_tolerance: default_failure_tolerance(),
    }]
}
