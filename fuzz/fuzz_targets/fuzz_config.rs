//! Fuzz target: `SystemConfig::from_json` (build-time override).
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Anything accepted also passes `validate()`
//!
//! cargo fuzz run fuzz_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use smarthouse::config::SystemConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(cfg) = SystemConfig::from_json(json) {
        assert!(cfg.validate().is_ok());
    }
});
