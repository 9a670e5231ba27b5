#![forbid(unsafe_code)]

pub mod config;
pub mod duration;
pub mod errors;
pub mod metrics;
pub mod render;
pub mod scorecard;
pub mod tabular;
pub mod traits;
pub mod types;
