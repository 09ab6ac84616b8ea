//! Error types for the rating engine
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

use crate::types::MatchId;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific rating engine scenarios
#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid match record {match_id}: {reason}")]
    InvalidMatchRecord { match_id: MatchId, reason: String },

    #[error(
        "Snapshot batch commit failed after {attempts} attempts (last committed match: {}): {message}",
        last_committed.map(|id| id.to_string()).unwrap_or_else(|| "none".to_string())
    )]
    PersistenceFailed {
        attempts: u32,
        last_committed: Option<MatchId>,
        message: String,
    },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Snapshot table is locked by another run: {path}")]
    Locked { path: String },

    #[error("Internal engine error: {message}")]
    InternalError { message: String },
}

impl RatingError {
    /// Shorthand for configuration failures
    pub fn configuration(message: impl Into<String>) -> Self {
        RatingError::Configuration {
            message: message.into(),
        }
    }
}
