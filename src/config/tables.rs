//! Versioned team tables: alias collapsing and international rank ordering
//!
//! Both tables are external data. They are loaded once at startup, validated,
//! and then handed to the identity resolver and the rating store. Updating them
//! never requires a rebuild.

use crate::error::{RatingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

/// Alias and tier tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamTables {
    /// Free-form version label, logged at startup
    pub version: String,
    /// Raw name -> canonical name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// International teams in rank order, best first, canonical names only
    #[serde(default)]
    pub rankings: Vec<String>,
    /// How many of the leading `rankings` form the top tier
    pub top_tier_size: usize,
    /// How many of the following `rankings` form the second tier
    pub second_tier_size: usize,
}

impl Default for TeamTables {
    fn default() -> Self {
        let aliases = [
            ("Delhi Daredevils", "Delhi Capitals"),
            ("Kings XI Punjab", "Punjab Kings"),
            ("Royal Challengers Bengaluru", "Royal Challengers Bangalore"),
            ("Rising Pune Supergiants", "Rising Pune Supergiant"),
            ("Deccan Chargers", "Sunrisers Hyderabad"),
            ("U.A.E.", "United Arab Emirates"),
            ("UAE", "United Arab Emirates"),
            ("U.S.A.", "United States of America"),
            ("USA", "United States of America"),
        ]
        .into_iter()
        .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
        .collect();

        let rankings = [
            "India",
            "Australia",
            "England",
            "New Zealand",
            "South Africa",
            "Pakistan",
            "Sri Lanka",
            "West Indies",
            "Bangladesh",
            "Afghanistan",
            "Ireland",
            "Zimbabwe",
            "Netherlands",
            "Scotland",
            "Namibia",
            "Nepal",
            "Oman",
            "United Arab Emirates",
            "United States of America",
            "Papua New Guinea",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            version: "builtin".to_string(),
            aliases,
            rankings,
            top_tier_size: 10,
            second_tier_size: 10,
        }
    }
}

impl TeamTables {
    /// Load and validate tables from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RatingError::configuration(format!(
                "Failed to read team tables {}: {}",
                path.display(),
                e
            ))
        })?;

        let tables = Self::from_toml_str(&contents)?;
        info!(
            "Loaded team tables version '{}' from {} - {} aliases, {} ranked teams",
            tables.version,
            path.display(),
            tables.aliases.len(),
            tables.rankings.len()
        );
        Ok(tables)
    }

    /// Parse and validate tables from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let tables: TeamTables = toml::from_str(contents).map_err(|e| {
            RatingError::configuration(format!("Malformed team tables: {}", e))
        })?;
        tables.validate()?;
        Ok(tables)
    }

    /// Reject tables that would silently corrupt resolution or initialization
    pub fn validate(&self) -> Result<()> {
        for (raw, canonical) in &self.aliases {
            if raw.trim().is_empty() || canonical.trim().is_empty() {
                return Err(RatingError::configuration(format!(
                    "Alias entries must not be blank ('{}' -> '{}')",
                    raw, canonical
                ))
                .into());
            }
            if raw.trim() == canonical.trim() {
                return Err(RatingError::configuration(format!(
                    "Team '{}' is aliased to itself",
                    raw
                ))
                .into());
            }
            if self.aliases.contains_key(canonical.trim()) {
                return Err(RatingError::configuration(format!(
                    "Alias chain: '{}' -> '{}' which is itself an alias",
                    raw, canonical
                ))
                .into());
            }
        }

        let mut seen = HashSet::new();
        for team in &self.rankings {
            let team = team.trim();
            if team.is_empty() {
                return Err(RatingError::configuration("Ranking entries must not be blank").into());
            }
            if self.aliases.contains_key(team) {
                return Err(RatingError::configuration(format!(
                    "Ranked team '{}' is an alias, rank the canonical name instead",
                    team
                ))
                .into());
            }
            if !seen.insert(team) {
                return Err(RatingError::configuration(format!(
                    "Team '{}' appears more than once in the rankings",
                    team
                ))
                .into());
            }
        }

        let tiered = self.top_tier_size + self.second_tier_size;
        if tiered > self.rankings.len() {
            return Err(RatingError::configuration(format!(
                "Tier sizes ({} + {}) exceed the {} ranked teams",
                self.top_tier_size,
                self.second_tier_size,
                self.rankings.len()
            ))
            .into());
        }

        Ok(())
    }
}
