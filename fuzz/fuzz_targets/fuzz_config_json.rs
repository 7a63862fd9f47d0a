//! Fuzz target: `ControllerConfig::from_json`
//!
//! Feeds arbitrary bytes to the config loader and verifies:
//! - No panics under any input
//! - Anything accepted passes `validate()` again and yields a pump burst
//!   strictly shorter than its cycle
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use growbox::config::ControllerConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = ControllerConfig::from_json(raw) {
        assert!(config.validate().is_ok());
        assert!(config.pump_on() < config.pump_cycle());
        assert!(config.measurement_interval() > chrono::Duration::zero());
    }
});
