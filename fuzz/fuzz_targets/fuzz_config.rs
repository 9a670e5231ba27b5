#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        let report = rollscore_core::config::check(&value, "fuzz.json", true);
        if let Ok(config) = rollscore_core::config::ScorerConfig::from_value(&value) {
            assert!(report.errors.is_empty());
            assert!(config.validate().is_ok());
        }
    }
});
