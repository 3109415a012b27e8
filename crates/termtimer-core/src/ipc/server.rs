//! IPC server: axum HTTP router over a Unix domain socket.
//!
//! The server never touches daemon state. Each request line is handed to
//! the control loop over an mpsc channel together with a oneshot slot for
//! the reply, so the timer store keeps a single owner.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};

use super::types::*;
use crate::daemon::ShutdownSignal;

/// One request/reply exchange handed to the control loop.
#[derive(Debug)]
pub struct Exchange {
    pub line: String,
    pub reply: oneshot::Sender<String>,
}

/// Shared state accessible to all IPC route handlers.
pub struct IpcState {
    pub requests: mpsc::Sender<Exchange>,
    pub started_at: Instant,
}

/// Errors acquiring the daemon endpoint.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("another daemon is already listening on {0}")]
    AlreadyRunning(PathBuf),

    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A Unix socket held exclusively by this process.
pub struct Endpoint {
    listener: UnixListener,
    path: PathBuf,
}

impl Endpoint {
    /// Bind `path`, refusing if a live daemon already answers there.
    ///
    /// A socket file nobody accepts on is left over from a daemon that died
    /// without cleaning up; it is removed and the bind retried once.
    pub async fn acquire(path: &Path) -> Result<Self, EndpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = match UnixListener::bind(path) {
            Ok(listener) => listener,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                if UnixStream::connect(path).await.is_ok() {
                    return Err(EndpointError::AlreadyRunning(path.to_path_buf()));
                }
                warn!(path = %path.display(), "Removing stale socket file");
                std::fs::remove_file(path)?;
                UnixListener::bind(path).map_err(|source| EndpointError::Bind {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(source) => {
                return Err(EndpointError::Bind {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Build the axum router with all IPC routes.
pub fn router(state: Arc<IpcState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handle_health))
        .route("/request", post(handle_request))
        .with_state(state)
}

/// Serve requests on an acquired endpoint until the shutdown signal, then
/// remove the socket file.
pub async fn serve(
    endpoint: Endpoint,
    state: Arc<IpcState>,
    mut shutdown_rx: broadcast::Receiver<ShutdownSignal>,
) -> Result<(), std::io::Error> {
    let Endpoint { listener, path } = endpoint;
    info!(path = %path.display(), "IPC server listening");

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("IPC server shutting down");
        })
        .await;

    std::fs::remove_file(&path).ok();
    served
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn handle_health(State(state): State<Arc<IpcState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::build_info::VERSION.to_string(),
        git_hash: crate::build_info::GIT_HASH.to_string(),
        build_profile: crate::build_info::BUILD_PROFILE.to_string(),
        pid: std::process::id(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

async fn handle_request(
    State(state): State<Arc<IpcState>>,
    line: String,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    let (reply_tx, reply_rx) = oneshot::channel();
    state
        .requests
        .send(Exchange {
            line,
            reply: reply_tx,
        })
        .await
        .map_err(|_| unavailable())?;
    reply_rx.await.map_err(|_| unavailable())
}

fn unavailable() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "daemon control loop is not running".to_string(),
        }),
    )
}
