//! Daemon IPC: Unix domain socket transport for the front-end.
//!
//! Each exchange is one HTTP/1.1 request over the socket: `POST /request`
//! carries a command line as the text body and gets the reply text back;
//! `GET /health` reports build metadata.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐        Unix socket        ┌──────────────┐  mpsc + oneshot  ┌──────────────┐
//! │ front-end │──────────────────────────▶│  IPC Server  │─────────────────▶│ Control loop │
//! └───────────┘   HTTP/1.1 + plain text   │   (axum)     │                  │ (owns timers)│
//!                                         └──────────────┘                  └──────────────┘
//! ```

pub mod client;
pub mod server;
pub mod types;

pub use client::{IpcClient, IpcClientError};
pub use server::{Endpoint, EndpointError, Exchange, IpcState};
pub use types::*;
