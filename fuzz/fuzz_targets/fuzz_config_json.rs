//! Fuzz target: `NodeConfig::from_json`
//!
//! Provisioned config is untrusted input.  Verifies:
//! - No panics on arbitrary bytes
//! - Anything accepted also passes `validate()`
//! - An accepted config survives a serialise / parse cycle
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensornode::config::NodeConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = NodeConfig::from_json(text) else {
        return;
    };

    assert!(config.validate().is_ok(), "accepted config failed validation");

    let json = serde_json::to_string(&config).expect("serialise accepted config");
    let again = NodeConfig::from_json(&json).expect("re-parse serialised config");
    assert_eq!(again.client_id, config.client_id);
    assert_eq!(again.kind, config.kind);
    assert_eq!(again.light_margin, config.light_margin);
});
