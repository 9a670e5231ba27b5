#![forbid(unsafe_code)]

pub mod merge;
pub mod scoring;
pub mod state;
pub mod telemetry;
