pub mod aggregator;

pub use aggregator::{detect_conflicts, merge, Dataset, MergeOutcome, Resolution};
