//! Core daemon process: startup, shutdown, and main control loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use termtimer_config::AppConfig;

use crate::alarm::{AlarmController, Notifier};
use crate::build_info;
use crate::ipc::server::{self, Endpoint, EndpointError, Exchange, IpcState};
use crate::ipc::types::SHUTDOWN_SENTINEL;
use crate::monitor;
use crate::notify::{Cadence, Chime, RepeatingNotifier, chime_from_config};
use crate::protocol::{Dispatcher, Reply, Session};
use crate::store::TimerStore;

/// Shutdown signal sent via broadcast channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal;

/// Depth of the request queue between the IPC server and the control loop.
const REQUEST_QUEUE: usize = 32;

/// All mutable daemon state. Owned by the control loop and nothing else.
pub struct TimerCore {
    store: TimerStore,
    alarm: AlarmController,
    dispatcher: Dispatcher,
}

impl TimerCore {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        let dispatcher = Dispatcher::new();
        debug!(commands = ?dispatcher.commands(), "Command table ready");
        Self {
            store: TimerStore::new(),
            alarm: AlarmController::new(notifier),
            dispatcher,
        }
    }

    /// Execute one request line.
    pub fn handle(&mut self, line: &str, now: DateTime<Utc>) -> Reply {
        debug!(request = line, "client>");
        let mut session = Session {
            store: &mut self.store,
            alarm: &mut self.alarm,
            now,
        };
        let reply = self.dispatcher.dispatch(&mut session, line);
        debug!(reply = ?reply, "server>");
        reply
    }

    /// Run the expiry monitor once. Returns the number of timers that fired.
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        monitor::sweep(&mut self.store, &mut self.alarm, now)
    }

    pub fn store(&self) -> &TimerStore {
        &self.store
    }

    pub fn alarm(&self) -> &AlarmController {
        &self.alarm
    }
}

/// The termtimer daemon.
pub struct Daemon {
    config: AppConfig,
    chime: Arc<dyn Chime>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    _shutdown_rx: broadcast::Receiver<ShutdownSignal>,
}

impl Daemon {
    /// Create a new daemon instance with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        let chime = chime_from_config(&config.alarm);

        Self {
            config,
            chime,
            shutdown_tx,
            _shutdown_rx,
        }
    }

    /// Replace the chime built from `[alarm] command`.
    pub fn with_chime(mut self, chime: Arc<dyn Chime>) -> Self {
        self.chime = chime;
        self
    }

    /// Socket path this daemon listens on.
    pub fn socket_path(&self) -> PathBuf {
        self.config.daemon.resolved_socket_path()
    }

    /// Run the daemon until a client says goodbye, the process is
    /// interrupted, or [`Daemon::shutdown`] is called.
    ///
    /// Fails without side effects if another daemon already owns the socket.
    pub async fn run(&self) -> Result<(), DaemonError> {
        let socket_path = self.socket_path();
        info!(
            version = %build_info::version_string(),
            socket = %socket_path.display(),
            "termtimer daemon starting"
        );

        let endpoint = Endpoint::acquire(&socket_path).await?;
        debug!(socket = %endpoint.path().display(), "Endpoint acquired");

        let (request_tx, mut request_rx) = mpsc::channel::<Exchange>(REQUEST_QUEUE);
        let state = Arc::new(IpcState {
            requests: request_tx,
            started_at: Instant::now(),
        });
        let server = tokio::spawn(server::serve(
            endpoint,
            state,
            self.shutdown_tx.subscribe(),
        ));

        let notifier =
            RepeatingNotifier::spawn(self.chime.clone(), Cadence::from(&self.config.alarm));
        let mut core = TimerCore::new(Box::new(notifier));
        let tick = Duration::from_millis(self.config.daemon.tick_interval_ms);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interrupted = interrupted();
        tokio::pin!(interrupted);

        loop {
            tokio::select! {
                received = request_rx.recv() => match received {
                    Some(Exchange { line, reply }) => {
                        let outcome = core.handle(&line, Utc::now());
                        let stop = outcome == Reply::Shutdown;
                        if reply.send(outcome.into_wire()).is_err() {
                            debug!("Client went away before the reply was sent");
                        }
                        if stop {
                            info!("Client requested shutdown");
                            break;
                        }
                    }
                    None => {
                        warn!("IPC server stopped, shutting down");
                        break;
                    }
                },
                () = tokio::time::sleep(tick) => {}
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping daemon");
                    break;
                }
                () = &mut interrupted => {
                    warn!("Interrupted, initiating graceful shutdown");
                    break;
                }
            }
            core.tick(Utc::now());
        }

        // Requests queued behind the exit still get exactly one reply, and
        // none may hold a connection open past graceful shutdown.
        request_rx.close();
        let mut turned_away = 0usize;
        while let Ok(Exchange { reply, .. }) = request_rx.try_recv() {
            let _ = reply.send(SHUTDOWN_SENTINEL.to_string());
            turned_away += 1;
        }
        drop(request_rx);
        if turned_away > 0 {
            debug!(turned_away, "Answered queued requests with the shutdown sentinel");
        }

        if !core.store().is_empty() {
            info!(remaining = core.store().len(), "Discarding unexpired timers");
        }
        core.alarm().silence();
        let _ = self.shutdown_tx.send(ShutdownSignal);

        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "IPC server error"),
            Err(e) => warn!(error = %e, "IPC server task failed"),
        }

        info!("Daemon stopped");
        Ok(())
    }

    /// Request a graceful shutdown of the daemon.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(ShutdownSignal);
    }

    /// Get a reference to the daemon's configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn interrupted() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Errors from the daemon runtime.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}
