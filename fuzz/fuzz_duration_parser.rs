//! Fuzz target for duration tokens.
//!
//! Run with: cargo +nightly fuzz run fuzz_duration_parser
//!
//! Large amounts must be rejected, never wrap or panic.

#![no_main]

use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use termtimer_core::duration::{expiry_after, format_duration, parse_duration};

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };
    if let Some(duration) = parse_duration(token) {
        let _ = format_duration(duration);
    }
    let now = DateTime::<Utc>::UNIX_EPOCH;
    if let Some((_, expiry)) = expiry_after(token, now) {
        assert!(expiry >= now);
    }
});
