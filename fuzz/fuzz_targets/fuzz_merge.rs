#![no_main]
use libfuzzer_sys::fuzz_target;
use rollscore_core::tabular;
use rollscore_core::types::ConflictPolicy;
use rollscore_engine::merge::{detect_conflicts, merge, Dataset};

fuzz_target!(|data: &[u8]| {
    // Split input into a base file and an incoming file
    let mid = data.len() / 2;
    let (left, right) = data.split_at(mid);
    let (Ok(left), Ok(right)) = (std::str::from_utf8(left), std::str::from_utf8(right)) else {
        return;
    };
    let (Ok(base), Ok(incoming)) = (tabular::from_csv(left), tabular::from_csv(right)) else {
        return;
    };
    let Ok(base) = Dataset::from_scorecards(base) else {
        return;
    };

    let conflicts = detect_conflicts(&base, incoming.clone());
    let aborted = merge(&base, incoming.clone(), ConflictPolicy::Abort);
    assert_eq!(aborted.is_err(), !conflicts.is_empty());

    for policy in [ConflictPolicy::Skip, ConflictPolicy::Overwrite] {
        let outcome = merge(&base, incoming.clone(), policy).expect("non-abort merge");
        assert_eq!(outcome.conflicts(), conflicts.len());
        assert_eq!(outcome.dataset.len(), base.len() + outcome.added);
    }
});
