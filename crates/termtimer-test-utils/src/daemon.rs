//! Daemon test helpers.
//!
//! [`TestDaemon`] runs a real [`Daemon`] on a socket inside a temporary
//! directory, with a [`RecordingChime`] in place of the configured command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use termtimer_config::AppConfig;
use termtimer_core::{Daemon, DaemonError, IpcClient};
use tokio::task::JoinHandle;

use crate::chime::RecordingChime;
use crate::config::TestConfigBuilder;

/// How long [`TestDaemon::start`] waits for `/health` to answer.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A test-scoped daemon with an owned temp directory for its socket.
///
/// The temp directory is deleted automatically when this value is dropped,
/// guaranteeing cleanup even on panic.
pub struct TestDaemon {
    pub socket_path: PathBuf,
    pub chime: RecordingChime,
    config: AppConfig,
    daemon: Arc<Daemon>,
    task: JoinHandle<Result<(), DaemonError>>,
    _temp_dir: TempDir,
}

impl TestDaemon {
    /// Start a daemon with test defaults.
    pub async fn start() -> Self {
        Self::start_with(TestConfigBuilder::new()).await
    }

    /// Start a daemon from a builder. The socket path is placed in a fresh
    /// temp directory unless the builder already names one.
    pub async fn start_with(builder: TestConfigBuilder) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let builder = if builder.has_socket_path() {
            builder
        } else {
            builder.socket_path(temp_dir.path().join("termtimer.sock"))
        };
        let config = builder.build();
        let socket_path = config.daemon.resolved_socket_path();

        let chime = RecordingChime::new();
        let daemon = Arc::new(Daemon::new(config.clone()).with_chime(Arc::new(chime.clone())));
        let task = tokio::spawn({
            let daemon = Arc::clone(&daemon);
            async move { daemon.run().await }
        });

        let client = IpcClient::new(&socket_path);
        let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;
        while client.health().await.is_err() {
            assert!(!task.is_finished(), "test daemon exited during startup");
            assert!(
                tokio::time::Instant::now() < deadline,
                "test daemon did not become healthy"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Self {
            socket_path,
            chime,
            config,
            daemon,
            task,
            _temp_dir: temp_dir,
        }
    }

    pub fn client(&self) -> IpcClient {
        IpcClient::new(&self.socket_path)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Ask the daemon to stop and wait for it.
    pub async fn stop(self) -> Result<(), DaemonError> {
        self.daemon.shutdown();
        self.join().await
    }

    /// Wait for the daemon to exit on its own, e.g. after `bye`.
    pub async fn join(self) -> Result<(), DaemonError> {
        tokio::time::timeout(STARTUP_TIMEOUT, self.task)
            .await
            .expect("test daemon did not exit in time")
            .expect("test daemon task panicked")
    }
}
