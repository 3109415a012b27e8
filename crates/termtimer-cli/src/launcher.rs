//! Starting the daemon on demand.
//!
//! The front-end asks `/health` first. When nobody answers it re-executes
//! itself as `termtimer daemon`, detached in its own process group, and
//! waits for the new daemon to come up. Two front-ends racing here is
//! harmless: the loser's daemon finds the socket taken and exits.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use termtimer_config::AppConfig;
use termtimer_core::IpcClient;
use tokio::time::Instant;
use tracing::{debug, info};

/// How long to wait for a freshly spawned daemon.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
const STARTUP_POLL: Duration = Duration::from_millis(50);

/// Return a client for a healthy daemon, spawning one if needed.
pub async fn ensure_daemon(config: &AppConfig, config_path: Option<&Path>) -> Result<IpcClient> {
    let client = IpcClient::new(config.daemon.resolved_socket_path());
    if let Ok(health) = client.health().await {
        debug!(pid = health.pid, version = %health.version, "Daemon already running");
        return Ok(client);
    }

    spawn_background(config, config_path)?;
    wait_until_healthy(&client, STARTUP_TIMEOUT).await?;
    Ok(client)
}

/// Spawn `termtimer daemon` detached, with output going to the configured
/// log file or nowhere.
fn spawn_background(config: &AppConfig, config_path: Option<&Path>) -> Result<u32> {
    let exe = std::env::current_exe().context("failed to find termtimer executable")?;

    let mut cmd = std::process::Command::new(exe);
    if let Some(path) = config_path {
        cmd.arg("--config").arg(path);
    }
    cmd.arg("daemon");
    cmd.stdin(Stdio::null());

    match &config.logging.file {
        Some(file) => {
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .with_context(|| format!("failed to open log file {file}"))?;
            let stderr_file = log_file
                .try_clone()
                .context("failed to clone log file handle")?;
            cmd.stdout(log_file);
            cmd.stderr(stderr_file);
        }
        None => {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::null());
        }
    }

    // Detach from our process group so Ctrl-C at the prompt doesn't reach it.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn().context("failed to spawn daemon process")?;
    let pid = child.id();
    info!(pid, "Spawned daemon");
    Ok(pid)
}

/// Poll `/health` until it answers or `timeout` passes.
pub async fn wait_until_healthy(client: &IpcClient, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        match client.health().await {
            Ok(_) => return Ok(()),
            Err(e) if Instant::now() >= deadline => {
                return Err(anyhow::Error::new(e).context(format!(
                    "daemon did not start listening on {}",
                    client.socket_path().display()
                )));
            }
            Err(_) => tokio::time::sleep(STARTUP_POLL).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termtimer_test_utils::TestDaemon;

    #[test_log::test(tokio::test)]
    async fn test_running_daemon_is_reused() {
        let daemon = TestDaemon::start().await;

        let client = ensure_daemon(daemon.config(), None).await.unwrap();
        assert_eq!(client.socket_path(), daemon.socket_path.as_path());

        daemon.stop().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_wait_gives_up_on_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let client = IpcClient::new(dir.path().join("nobody.sock"));

        let result = wait_until_healthy(&client, Duration::from_millis(120)).await;
        assert!(result.is_err());
    }
}
