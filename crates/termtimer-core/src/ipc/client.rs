//! IPC client: connects to the daemon over a Unix domain socket.
//!
//! Uses `hyper` for HTTP/1.1 over the socket. One connection per request.

use std::path::{Path, PathBuf};

use hyper::body::Bytes;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tracing::debug;

use super::types::*;

/// Errors from the IPC client.
#[derive(Debug, thiserror::Error)]
pub enum IpcClientError {
    #[error("failed to connect to daemon socket at {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("daemon is not running (socket not found at {0})")]
    NotRunning(PathBuf),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("daemon returned error: {0}")]
    DaemonError(String),
}

/// Client for the termtimer daemon.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    /// Create a new IPC client targeting the given socket path.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Check if the daemon socket exists (daemon is likely running).
    pub fn daemon_available(&self) -> bool {
        self.socket_path.exists()
    }

    async fn exchange(
        &self,
        method: hyper::Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<Bytes, IpcClientError> {
        if !self.daemon_available() {
            return Err(IpcClientError::NotRunning(self.socket_path.clone()));
        }

        let stream =
            UnixStream::connect(&self.socket_path)
                .await
                .map_err(|e| IpcClientError::Connect {
                    path: self.socket_path.clone(),
                    source: e,
                })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake::<
            _,
            http_body_util::Full<Bytes>,
        >(TokioIo::new(stream))
        .await
        .map_err(|e| IpcClientError::Request(format!("HTTP handshake failed: {e}")))?;

        // Drive the connection in the background
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!(error = %e, "IPC connection error");
            }
        });

        debug!(%method, path, "IPC request");

        let mut builder = hyper::Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");
        let req_body = match body {
            Some(text) => {
                builder = builder.header("content-type", "text/plain; charset=utf-8");
                http_body_util::Full::new(Bytes::copy_from_slice(text.as_bytes()))
            }
            None => http_body_util::Full::new(Bytes::new()),
        };

        let req = builder
            .body(req_body)
            .map_err(|e| IpcClientError::Request(format!("failed to build request: {e}")))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| IpcClientError::Request(format!("request failed: {e}")))?;

        let status = resp.status();

        let resp_body = http_body_util::BodyExt::collect(resp.into_body())
            .await
            .map_err(|e| IpcClientError::Request(format!("failed to read response body: {e}")))?
            .to_bytes();

        if !status.is_success() {
            if let Ok(err) = serde_json::from_slice::<ErrorResponse>(&resp_body) {
                return Err(IpcClientError::DaemonError(err.error));
            }
            return Err(IpcClientError::Request(format!(
                "unexpected status: {status}"
            )));
        }

        Ok(resp_body)
    }

    /// Is the daemon running and responsive?
    pub async fn health(&self) -> Result<HealthResponse, IpcClientError> {
        let body = self.exchange(hyper::Method::GET, "/health", None).await?;
        serde_json::from_slice(&body).map_err(|e| IpcClientError::Parse(format!("health: {e}")))
    }

    /// Send one request line and return the daemon's reply.
    pub async fn send(&self, line: &str) -> Result<String, IpcClientError> {
        let body = self
            .exchange(hyper::Method::POST, "/request", Some(line))
            .await?;
        String::from_utf8(body.to_vec())
            .map_err(|e| IpcClientError::Parse(format!("reply is not UTF-8: {e}")))
    }

    /// Empty request: liveness probe that also drains expired timers.
    pub async fn poll(&self) -> Result<String, IpcClientError> {
        self.send("").await
    }

    /// Fetch and decode the `list` reply.
    pub async fn list(&self) -> Result<Vec<TimerRecord>, IpcClientError> {
        let reply = self.send("list").await?;
        serde_json::from_str(&reply).map_err(|e| IpcClientError::Parse(format!("list: {e}")))
    }
}
