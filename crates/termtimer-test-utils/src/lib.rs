#![deny(unsafe_code)]

//! Shared test utilities for the termtimer workspace.
//!
//! Provides a scoped daemon fixture, config builders, a recording chime and
//! tracing helpers so that individual crate tests stay concise and
//! consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! termtimer-test-utils = { workspace = true }
//! ```

pub mod chime;
pub mod config;
pub mod daemon;
pub mod tracing_setup;

pub use chime::RecordingChime;
pub use config::TestConfigBuilder;
pub use daemon::TestDaemon;
