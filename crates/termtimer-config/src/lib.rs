#![deny(unsafe_code)]

//! Configuration loading and validation for termtimer.
//!
//! Loads TOML configuration files and validates them. [`AppConfig`] is the
//! central configuration structure shared by the daemon and the front-end.
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon configuration.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Alarm cadence and notifier command.
    #[serde(default)]
    pub alarm: AlarmConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the core daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket the daemon binds. When unset, a per-user path is derived
    /// by [`DaemonConfig::resolved_socket_path`].
    #[serde(default)]
    pub socket_path: Option<String>,

    /// How long the control loop waits for a request before sweeping
    /// expired timers anyway.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    500
}

/// Upper bound for `daemon.tick_interval_ms`.
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;

impl DaemonConfig {
    /// Resolve the socket path: the configured one, else
    /// `$XDG_RUNTIME_DIR/termtimer/termtimer.sock`, else
    /// `/tmp/termtimer-$USER.sock`.
    pub fn resolved_socket_path(&self) -> PathBuf {
        if let Some(path) = self.socket_path.as_deref() {
            return PathBuf::from(path);
        }
        if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
            if !runtime_dir.is_empty() {
                return PathBuf::from(runtime_dir)
                    .join("termtimer")
                    .join("termtimer.sock");
            }
        }
        let user = std::env::var("USER").unwrap_or_else(|_| "default".to_string());
        std::env::temp_dir().join(format!("termtimer-{user}.sock"))
    }
}

/// Alarm configuration.
///
/// While any expired timer is unacknowledged the daemon rings `burst` times,
/// `burst_gap_ms` apart, then waits `pause_ms` and starts over.
///
/// ## TOML Example
///
/// ```toml
/// [alarm]
/// command = ["paplay", "/usr/share/sounds/freedesktop/stereo/bell.oga"]
/// burst = 3
/// burst_gap_ms = 150
/// pause_ms = 5000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Program and arguments spawned for every ring. Empty means the alarm
    /// is only written to the log.
    #[serde(default = "default_alarm_command")]
    pub command: Vec<String>,

    /// Rings per cycle.
    #[serde(default = "default_alarm_burst")]
    pub burst: u32,

    /// Pause between rings of one burst.
    #[serde(default = "default_alarm_burst_gap_ms")]
    pub burst_gap_ms: u64,

    /// Pause after a burst.
    #[serde(default = "default_alarm_pause_ms")]
    pub pause_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            command: default_alarm_command(),
            burst: default_alarm_burst(),
            burst_gap_ms: default_alarm_burst_gap_ms(),
            pause_ms: default_alarm_pause_ms(),
        }
    }
}

// paplay stays silent when started from a detached process, aplay does not,
// so the bell is transcoded to wav first.
fn default_alarm_command() -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        "ffmpeg -i /usr/share/sounds/freedesktop/stereo/bell.oga -f wav - 2>/dev/null \
         | aplay --quiet 2>/dev/null"
            .to_string(),
    ]
}

fn default_alarm_burst() -> u32 {
    2
}

fn default_alarm_burst_gap_ms() -> u64 {
    200
}

fn default_alarm_pause_ms() -> u64 {
    2000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// File the detached daemon writes its log to. Without it the daemon
    /// spawned by the front-end logs nowhere.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Per-user config file: `$XDG_CONFIG_HOME/termtimer/termtimer.toml`,
    /// else `$HOME/.config/termtimer/termtimer.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("termtimer").join("termtimer.toml"))
    }

    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.tick_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "daemon.tick_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.daemon.tick_interval_ms > MAX_TICK_INTERVAL_MS {
            return Err(ConfigError::Validation(format!(
                "daemon.tick_interval_ms must be at most {MAX_TICK_INTERVAL_MS}, got {}",
                self.daemon.tick_interval_ms
            )));
        }
        if matches!(self.daemon.socket_path.as_deref(), Some("")) {
            return Err(ConfigError::Validation(
                "daemon.socket_path must not be empty".to_string(),
            ));
        }

        if self.alarm.burst == 0 {
            return Err(ConfigError::Validation(
                "alarm.burst must be at least 1".to_string(),
            ));
        }
        if self.alarm.pause_ms == 0 {
            return Err(ConfigError::Validation(
                "alarm.pause_ms must be non-zero".to_string(),
            ));
        }
        if matches!(self.alarm.command.first(), Some(program) if program.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "alarm.command must start with a program name".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}
