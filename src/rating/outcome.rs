//! Elo outcome model
//!
//! Turns two pre-match ratings and a match outcome into integer rating deltas.
//! Expected scores come from the classic Elo logistic curve (via skillratings);
//! deltas are `K * (actual - expected)` rounded half away from zero.

use crate::config::EngineSettings;
use crate::types::{MatchClassification, MatchOutcome, Rating};
use serde::{Deserialize, Serialize};
use skillratings::elo::EloRating;
use std::sync::Arc;

/// Chooses the K factor for a match
///
/// The shipped policy depends on classification only. Margin-of-victory or
/// format-based scaling plugs in here.
#[cfg_attr(test, mockall::automock)]
pub trait KFactorPolicy: Send + Sync {
    fn k_factor(&self, classification: MatchClassification) -> f64;
}

/// K factor taken from engine settings
#[derive(Debug, Clone)]
pub struct ConfiguredKFactor {
    settings: EngineSettings,
}

impl ConfiguredKFactor {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Same K for every match
    pub fn constant(k_factor: f64) -> Self {
        Self::new(EngineSettings {
            k_factor,
            ..EngineSettings::default()
        })
    }
}

impl KFactorPolicy for ConfiguredKFactor {
    fn k_factor(&self, classification: MatchClassification) -> f64 {
        self.settings.k_factor_for(classification)
    }
}

/// Full breakdown of one rating update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub expected_a: f64,
    pub expected_b: f64,
    pub actual_a: f64,
    pub actual_b: f64,
    pub k_factor: f64,
    pub delta_a: Rating,
    pub delta_b: Rating,
}

/// The single rounding rule used for rating deltas
pub fn round_delta(raw: f64) -> Rating {
    // f64::round rounds half away from zero
    raw.round() as Rating
}

/// Elo outcome model with a pluggable K factor
#[derive(Clone)]
pub struct EloOutcomeModel {
    k_policy: Arc<dyn KFactorPolicy>,
}

impl std::fmt::Debug for EloOutcomeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EloOutcomeModel").finish_non_exhaustive()
    }
}

impl EloOutcomeModel {
    pub fn new(k_policy: Arc<dyn KFactorPolicy>) -> Self {
        Self { k_policy }
    }

    /// Model with a constant K factor
    pub fn with_constant_k(k_factor: f64) -> Self {
        Self::new(Arc::new(ConfiguredKFactor::constant(k_factor)))
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(Arc::new(ConfiguredKFactor::new(settings.clone())))
    }

    /// Expected scores `(a, b)`; they always sum to one
    pub fn expected_scores(rating_a: Rating, rating_b: Rating) -> (f64, f64) {
        skillratings::elo::expected_score(
            &EloRating {
                rating: rating_a as f64,
            },
            &EloRating {
                rating: rating_b as f64,
            },
        )
    }

    /// Compute the complete update for one match
    pub fn compute(
        &self,
        rating_a: Rating,
        rating_b: Rating,
        outcome: MatchOutcome,
        classification: MatchClassification,
    ) -> RatingUpdate {
        let (expected_a, expected_b) = Self::expected_scores(rating_a, rating_b);
        let (actual_a, actual_b) = outcome.actual_scores();
        let k_factor = self.k_policy.k_factor(classification);

        // B's own expression rounds to exactly the negation under this rule
        let delta_a = round_delta(k_factor * (actual_a - expected_a));

        RatingUpdate {
            expected_a,
            expected_b,
            actual_a,
            actual_b,
            k_factor,
            delta_a,
            delta_b: -delta_a,
        }
    }

    /// Signed deltas `(a, b)` for one match
    pub fn compute_deltas(
        &self,
        rating_a: Rating,
        rating_b: Rating,
        outcome: MatchOutcome,
        classification: MatchClassification,
    ) -> (Rating, Rating) {
        let update = self.compute(rating_a, rating_b, outcome, classification);
        (update.delta_a, update.delta_b)
    }
}

impl Default for EloOutcomeModel {
    fn default() -> Self {
        Self::with_constant_k(32.0)
    }
}
