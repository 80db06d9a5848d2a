//! Fuzz target for `pm2 --version` output.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pm2ctl_core::inventory::parse_version;

fuzz_target!(|data: &str| {
    let version = parse_version(data);
    assert!(!version.contains('\n'));
});
