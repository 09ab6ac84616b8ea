//! Running rating state for one processing pass
//!
//! The store owns the current rating of every team seen so far in a pass.
//! Mutation goes through `&mut self`, so the single owner (the chronological
//! processor) is the only writer.

use crate::config::{RatingConfig, TeamTables};
use crate::types::{LeaderboardEntry, MatchClassification, Rating, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Rank tier of an international team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingTier {
    Top,
    Second,
    Unranked,
}

/// Starting rating policy for teams seen for the first time
#[derive(Debug, Clone)]
pub struct InitialRatingPolicy {
    config: RatingConfig,
    tiers: HashMap<TeamId, RatingTier>,
}

impl InitialRatingPolicy {
    /// Build the policy from the rating constants and the rank ordering
    pub fn new(config: RatingConfig, tables: &TeamTables) -> Self {
        let mut tiers = HashMap::new();
        for (position, team) in tables.rankings.iter().enumerate() {
            let tier = if position < tables.top_tier_size {
                RatingTier::Top
            } else if position < tables.top_tier_size + tables.second_tier_size {
                RatingTier::Second
            } else {
                RatingTier::Unranked
            };
            tiers.insert(team.trim().to_string(), tier);
        }

        Self { config, tiers }
    }

    pub fn tier_of(&self, team: &str) -> RatingTier {
        self.tiers
            .get(team)
            .copied()
            .unwrap_or(RatingTier::Unranked)
    }

    /// Rating a canonical team starts from in a match of the given kind
    pub fn initial_rating(&self, team: &str, classification: MatchClassification) -> Rating {
        match classification {
            MatchClassification::Domestic => self.config.league_rating,
            MatchClassification::International => match self.tier_of(team) {
                RatingTier::Top => self.config.top_tier_rating,
                RatingTier::Second => self.config.second_tier_rating,
                RatingTier::Unranked => self.config.base_rating,
            },
        }
    }
}

impl Default for InitialRatingPolicy {
    fn default() -> Self {
        Self::new(RatingConfig::default(), &TeamTables::default())
    }
}

/// In-memory canonical team -> current rating
#[derive(Debug, Clone)]
pub struct RatingStore {
    ratings: HashMap<TeamId, Rating>,
    policy: InitialRatingPolicy,
}

impl RatingStore {
    pub fn new(policy: InitialRatingPolicy) -> Self {
        Self {
            ratings: HashMap::new(),
            policy,
        }
    }

    /// Current rating, initializing the team on first access
    pub fn get(&mut self, team: &str, classification: MatchClassification) -> Rating {
        if let Some(rating) = self.ratings.get(team) {
            return *rating;
        }

        let rating = self.policy.initial_rating(team, classification);
        debug!(
            "Initialized '{}' at {} ({} match, tier {:?})",
            team,
            rating,
            classification,
            self.policy.tier_of(team)
        );
        self.ratings.insert(team.to_string(), rating);
        rating
    }

    /// Current rating without initializing
    pub fn peek(&self, team: &str) -> Option<Rating> {
        self.ratings.get(team).copied()
    }

    /// Unconditional overwrite
    pub fn set(&mut self, team: &str, rating: Rating) {
        self.ratings.insert(team.to_string(), rating);
    }

    /// Load reconstructed state before processing starts
    pub fn seed(&mut self, ratings: impl IntoIterator<Item = (TeamId, Rating)>) {
        self.ratings.extend(ratings);
    }

    pub fn contains(&self, team: &str) -> bool {
        self.ratings.contains_key(team)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Teams ranked by rating, highest first; ties break on name
    pub fn leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<(&TeamId, &Rating)> = self.ratings.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        entries
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(index, (team, rating))| LeaderboardEntry {
                rank: index + 1,
                team: team.clone(),
                rating: *rating,
            })
            .collect()
    }
}

impl Default for RatingStore {
    fn default() -> Self {
        Self::new(InitialRatingPolicy::default())
    }
}
