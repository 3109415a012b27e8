//! Build-time metadata embedded by the build script.
//!
//! Reported by the daemon's `/health` endpoint and logged at startup.

/// The git commit hash at build time (short form).
pub const GIT_HASH: &str = env!("TERMTIMER_GIT_HASH");

/// The build timestamp as a Unix epoch string.
pub const BUILD_TIMESTAMP: &str = env!("TERMTIMER_BUILD_TIMESTAMP");

/// The build profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("TERMTIMER_BUILD_PROFILE");

/// The crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version including git hash and profile, e.g. `"0.1.0 (abc1234, debug)"`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TERMTIMER_GIT_HASH"),
    ", ",
    env!("TERMTIMER_BUILD_PROFILE"),
    ")"
);

/// Owned copy of [`LONG_VERSION`] for structured log fields.
pub fn version_string() -> String {
    LONG_VERSION.to_string()
}
