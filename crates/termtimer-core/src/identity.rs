//! Timer identities.
//!
//! Identities are ULIDs drawn from a monotonic generator: the timestamp
//! part orders them by creation time and, when several are issued in the
//! same millisecond, the random part is incremented instead of redrawn, so
//! every identity is strictly greater than the previous one. Uniqueness
//! holds within one process only; the daemon's exclusive endpoint keeps a
//! second generator from ever running against the same timer set.

use std::fmt;
use std::str::FromStr;

use ulid::{Generator, Ulid};

/// Opaque, time-ordered identity of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(Ulid);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TimerId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Errors from identity generation.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity space exhausted within one millisecond")]
    Exhausted,
}

/// Issues strictly increasing [`TimerId`]s.
pub struct IdentityGenerator {
    generator: Generator,
}

impl IdentityGenerator {
    pub fn new() -> Self {
        Self {
            generator: Generator::new(),
        }
    }

    /// Issue the next identity.
    pub fn next_id(&mut self) -> Result<TimerId, IdentityError> {
        self.generator
            .generate()
            .map(TimerId)
            .map_err(|_| IdentityError::Exhausted)
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}
