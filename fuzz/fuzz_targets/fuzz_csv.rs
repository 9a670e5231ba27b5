#![no_main]
use libfuzzer_sys::fuzz_target;
use rollscore_core::tabular;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(cards) = tabular::from_csv(text) {
            // Anything accepted must survive a write and re-read unchanged.
            let again = tabular::from_csv(&tabular::to_csv(&cards)).expect("re-read");
            assert_eq!(cards, again);
        }
    }
});
