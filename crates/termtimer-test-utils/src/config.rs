//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::Path;

use termtimer_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// Starts from the defaults with a faster tick and a log-only alarm command,
/// so nothing audible happens while tests run.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .socket_path(dir.path().join("tt.sock"))
///     .tick_interval_ms(20)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.daemon.tick_interval_ms = 50;
        config.alarm.command = Vec::new();
        Self { config }
    }

    pub fn socket_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.daemon.socket_path = Some(path.as_ref().display().to_string());
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.daemon.tick_interval_ms = ms;
        self
    }

    pub fn alarm_command(mut self, argv: &[&str]) -> Self {
        self.config.alarm.command = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Rings per burst, gap between rings and pause between bursts.
    pub fn cadence(mut self, burst: u32, burst_gap_ms: u64, pause_ms: u64) -> Self {
        self.config.alarm.burst = burst;
        self.config.alarm.burst_gap_ms = burst_gap_ms;
        self.config.alarm.pause_ms = pause_ms;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn has_socket_path(&self) -> bool {
        self.config.daemon.socket_path.is_some()
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
