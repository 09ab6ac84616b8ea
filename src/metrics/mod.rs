//! Metrics for the rating engine
//!
//! Prometheus counters and histograms describing processing runs and snapshot
//! persistence. The batch job exposes them as text for diagnostics.

pub mod collector;

pub use collector::{CommitStatus, EngineMetrics};
