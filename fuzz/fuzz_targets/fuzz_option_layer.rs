//! Fuzz target for option file decoding.
//!
//! Tests that JSON option layers decode or fail cleanly on arbitrary input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm2ctl_core::config::OptionLayer;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<OptionLayer>(data);
});
