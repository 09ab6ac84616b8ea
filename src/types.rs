//! Common types used throughout the rating engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Canonical team identity after alias collapsing
pub type TeamId = String;

/// Identifier of a match record in the external match log
pub type MatchId = u64;

/// Integer Elo rating
pub type Rating = i64;

/// Kind of fixture a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchClassification {
    /// Domestic franchise/league cricket
    Domestic,
    /// Representative (national team) cricket
    International,
}

impl std::fmt::Display for MatchClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchClassification::Domestic => write!(f, "domestic"),
            MatchClassification::International => write!(f, "international"),
        }
    }
}

impl FromStr for MatchClassification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "domestic" | "league" | "club" => Ok(MatchClassification::Domestic),
            "international" | "representative" | "national" => {
                Ok(MatchClassification::International)
            }
            other => Err(format!("unknown match classification '{}'", other)),
        }
    }
}

/// A single row of the historical match log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    /// Missing dates make the record unorderable
    pub date: Option<NaiveDate>,
    pub team_a: String,
    pub team_b: String,
    pub classification: MatchClassification,
    /// Raw winner name; absent for ties and no results
    pub winner: Option<String>,
    /// Why the source row could not be read in full
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl MatchRecord {
    pub fn new(
        id: MatchId,
        date: NaiveDate,
        team_a: impl Into<String>,
        team_b: impl Into<String>,
        classification: MatchClassification,
        winner: Option<&str>,
    ) -> Self {
        Self {
            id,
            date: Some(date),
            team_a: team_a.into(),
            team_b: team_b.into(),
            classification,
            winner: winner.map(str::to_string),
            parse_error: None,
        }
    }

    /// Placeholder for a source row whose fields could not be read
    ///
    /// Only the id (and the date, when readable) survive; the processor skips
    /// and counts the record.
    pub fn unreadable(id: MatchId, date: Option<NaiveDate>, reason: impl Into<String>) -> Self {
        Self {
            id,
            date,
            team_a: String::new(),
            team_b: String::new(),
            classification: MatchClassification::Domestic,
            winner: None,
            parse_error: Some(reason.into()),
        }
    }

    /// Processing order key. Undated records sort first so they surface early
    pub fn sort_key(&self) -> (Option<NaiveDate>, MatchId) {
        (self.date, self.id)
    }
}

/// Result of a match from team A's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    TeamAWon,
    TeamBWon,
    /// Tie, abandonment, or a winner that matched neither side
    NoResult,
}

impl MatchOutcome {
    /// Actual scores `(a, b)` used by the Elo update
    pub fn actual_scores(self) -> (f64, f64) {
        match self {
            MatchOutcome::TeamAWon => (1.0, 0.0),
            MatchOutcome::TeamBWon => (0.0, 1.0),
            MatchOutcome::NoResult => (0.5, 0.5),
        }
    }
}

/// Persisted pre-match ratings of both participants of one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub match_id: MatchId,
    pub date: NaiveDate,
    pub team_a: TeamId,
    pub team_b: TeamId,
    pub classification: MatchClassification,
    pub outcome: MatchOutcome,
    pub rating_a: Rating,
    pub rating_b: Rating,
}

impl RatingSnapshot {
    pub fn sort_key(&self) -> (NaiveDate, MatchId) {
        (self.date, self.match_id)
    }

    /// Pre-match rating of `team` if it took part in this match
    pub fn rating_for(&self, team: &str) -> Option<Rating> {
        if self.team_a == team {
            Some(self.rating_a)
        } else if self.team_b == team {
            Some(self.rating_b)
        } else {
            None
        }
    }
}

/// One row of a ranked rating table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub team: TeamId,
    pub rating: Rating,
}

/// One point of a team's rating trajectory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingHistoryPoint {
    pub match_id: MatchId,
    pub date: NaiveDate,
    pub opponent: TeamId,
    pub pre_match_rating: Rating,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_classification_parsing() {
        assert_eq!(
            "Domestic".parse::<MatchClassification>().unwrap(),
            MatchClassification::Domestic
        );
        assert_eq!(
            " international ".parse::<MatchClassification>().unwrap(),
            MatchClassification::International
        );
        assert_eq!(
            "league".parse::<MatchClassification>().unwrap(),
            MatchClassification::Domestic
        );
        assert!("friendly".parse::<MatchClassification>().is_err());
    }

    #[test]
    fn test_unreadable_record() {
        let record = MatchRecord::unreadable(12, Some(date(2008, 4, 20)), "expected 6 fields, found 3");
        assert_eq!(record.sort_key(), (Some(date(2008, 4, 20)), 12));
        assert!(record.team_a.is_empty());
        assert_eq!(record.parse_error.as_deref(), Some("expected 6 fields, found 3"));

        let clean = MatchRecord::new(
            1,
            date(2008, 4, 18),
            "Kolkata Knight Riders",
            "Royal Challengers Bangalore",
            MatchClassification::Domestic,
            Some("Kolkata Knight Riders"),
        );
        assert!(clean.parse_error.is_none());
    }

    #[test]
    fn test_actual_scores() {
        assert_eq!(MatchOutcome::TeamAWon.actual_scores(), (1.0, 0.0));
        assert_eq!(MatchOutcome::TeamBWon.actual_scores(), (0.0, 1.0));
        assert_eq!(MatchOutcome::NoResult.actual_scores(), (0.5, 0.5));
    }

    #[test]
    fn test_snapshot_rating_for() {
        let snapshot = RatingSnapshot {
            match_id: 7,
            date: date(2011, 4, 2),
            team_a: "India".to_string(),
            team_b: "Sri Lanka".to_string(),
            classification: MatchClassification::International,
            outcome: MatchOutcome::TeamAWon,
            rating_a: 1620,
            rating_b: 1580,
        };

        assert_eq!(snapshot.rating_for("India"), Some(1620));
        assert_eq!(snapshot.rating_for("Sri Lanka"), Some(1580));
        assert_eq!(snapshot.rating_for("Australia"), None);
    }
}
