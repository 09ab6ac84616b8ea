//! Cricket Ratings - chronological Elo rating engine for cricket teams
//!
//! This crate replays a historical match log in date order, maintaining an
//! integer Elo rating per canonical team and persisting the pre-match ratings
//! of every match. Runs resume from the earliest unrated match, so a job that
//! is stopped or fails part-way can be restarted without redoing history.

pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod persistence;
pub mod rating;
pub mod source;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use engine::{ChronologicalProcessor, ResumeCoordinator, RunOptions, RunSummary};
pub use persistence::{JsonFileSnapshotRepository, SnapshotRepository};
pub use source::{CsvMatchSource, MatchSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
