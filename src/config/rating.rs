//! Initial rating configuration

use crate::error::{RatingError, Result};
use crate::types::Rating;
use serde::{Deserialize, Serialize};

/// Starting ratings handed out on a team's first appearance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Every domestic league team
    pub league_rating: Rating,
    /// International teams in the top ranked tier
    pub top_tier_rating: Rating,
    /// International teams in the second ranked tier
    pub second_tier_rating: Rating,
    /// Every other international team
    pub base_rating: Rating,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            league_rating: 1500,
            top_tier_rating: 1500,
            second_tier_rating: 1350,
            base_rating: 1200,
        }
    }
}

impl RatingConfig {
    /// Tiers must be ordered and every constant positive
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.league_rating,
            self.top_tier_rating,
            self.second_tier_rating,
            self.base_rating,
        ];
        if all.iter().any(|r| *r <= 0) {
            return Err(RatingError::configuration("Initial ratings must be positive").into());
        }

        if self.top_tier_rating < self.second_tier_rating
            || self.second_tier_rating < self.base_rating
        {
            return Err(RatingError::configuration(format!(
                "Tier ratings must not increase down the tiers (top {}, second {}, base {})",
                self.top_tier_rating, self.second_tier_rating, self.base_rating
            ))
            .into());
        }

        Ok(())
    }
}
