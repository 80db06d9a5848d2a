//! Fuzz target for `pm2 jlist` decoding.
//!
//! Tests that `parse_jlist` handles arbitrary input without panicking, and
//! that the stale-registry check never panics on the same input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm2ctl_core::inventory::{is_stale_registry, parse_jlist};

fuzz_target!(|data: &str| {
    let _ = is_stale_registry(data);
    if let Ok(processes) = parse_jlist(data) {
        // Every decoded process must serialize back into the facts shape
        let _ = serde_json::to_string(&processes);
    }
});
