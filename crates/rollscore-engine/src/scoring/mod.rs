pub mod engine;

pub use engine::{score, ScoringEngine};
