//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text through `AppConfig::parse()`, which both parses and
//! validates, to find panics in either step.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = termtimer_config::AppConfig::parse(s) {
            // Anything that validates must also resolve a socket path.
            let _ = config.daemon.resolved_socket_path();
        }
    }
});
