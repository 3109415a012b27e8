#![deny(unsafe_code)]

//! termtimer core daemon runtime.
//!
//! Holds a set of named countdown timers in memory, answers the text
//! command protocol over a Unix socket, and keeps ringing once a timer
//! expires until a client polls for the summary.

/// Expired-timer queue and the idle/active alarm state.
pub mod alarm;
/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Async daemon runtime and control loop.
pub mod daemon;
/// Duration tokens such as `1h30m` and the human-readable renderings.
pub mod duration;
/// Monotonic, time-ordered timer identities.
pub mod identity;
/// Unix socket transport between the front-end and the daemon.
pub mod ipc;
pub mod monitor;
/// Background ringing task and chime implementations.
pub mod notify;
/// Request parsing and command handlers.
pub mod protocol;
pub mod store;

pub use alarm::{AlarmController, AlarmState, Notifier};
pub use daemon::{Daemon, DaemonError, TimerCore};
pub use identity::{IdentityError, TimerId};
pub use ipc::{IpcClient, IpcClientError};
pub use notify::{Chime, CommandChime, LogChime};
pub use protocol::{Dispatcher, Reply};
pub use store::{Timer, TimerStore};
