//! Fuzz target for the text command protocol.
//!
//! Run with: cargo +nightly fuzz run fuzz_request_line
//!
//! Every line must produce a reply and leave the daemon state usable.

#![no_main]

use chrono::Utc;
use libfuzzer_sys::fuzz_target;
use termtimer_core::{Notifier, Reply, TimerCore};

struct Silent;

impl Notifier for Silent {
    fn start_alerting(&self) {}
    fn stop_alerting(&self) {}
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut core = TimerCore::new(Box::new(Silent));
    let now = Utc::now();
    for line in text.lines() {
        if core.handle(line, now) == Reply::Shutdown {
            break;
        }
        core.tick(now);
    }
    let _ = core.handle("list", now);
});
