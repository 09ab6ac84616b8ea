//! Elo rating model and running rating state
//!
//! This module provides the outcome model (expected scores and integer
//! deltas), the pluggable K factor, and the in-memory rating store with its
//! tiered initialization policy.

pub mod outcome;
pub mod store;

// Re-export commonly used types
pub use outcome::{round_delta, ConfiguredKFactor, EloOutcomeModel, KFactorPolicy, RatingUpdate};
pub use store::{InitialRatingPolicy, RatingStore, RatingTier};
