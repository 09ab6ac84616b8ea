//! Run summaries

use super::processor::ProcessingReport;
use crate::types::{LeaderboardEntry, MatchId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a run chose its starting point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Resume from the earliest unrated match
    Incremental,
    /// Recompute every match from initial ratings
    Full,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Incremental => "incremental",
            RunMode::Full => "full",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one invocation of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Earliest dated match without a snapshot
    pub gap_date: Option<NaiveDate>,
    /// First date processed, after the overlap window is applied
    pub resume_date: Option<NaiveDate>,
    /// Teams seeded from persisted snapshots
    pub teams_seeded: usize,
    pub matches_seen: usize,
    pub snapshots_written: usize,
    pub skipped: usize,
    /// Undated records in the log; both modes set them aside before processing
    pub undated: usize,
    pub data_defects: usize,
    pub last_committed: Option<MatchId>,
    pub stopped_early: bool,
    pub teams_rated: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl RunSummary {
    pub(crate) fn new(mode: RunMode, run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            mode,
            started_at,
            finished_at: started_at,
            gap_date: None,
            resume_date: None,
            teams_seeded: 0,
            matches_seen: 0,
            snapshots_written: 0,
            skipped: 0,
            undated: 0,
            data_defects: 0,
            last_committed: None,
            stopped_early: false,
            teams_rated: 0,
            leaderboard: Vec::new(),
        }
    }

    pub(crate) fn absorb(&mut self, report: &ProcessingReport) {
        self.matches_seen = report.matches_seen;
        self.snapshots_written = report.snapshots_written;
        self.skipped = report.skipped;
        self.data_defects = report.data_defects;
        self.last_committed = report.last_committed;
        self.stopped_early = report.stopped_early;
    }

    /// Matches that were rated, data defects included
    pub fn processed(&self) -> usize {
        self.matches_seen - self.skipped
    }

    /// Skipped and undated records plus data defects
    pub fn errors(&self) -> usize {
        self.skipped + self.undated + self.data_defects
    }

    /// The run found nothing to process
    pub fn is_noop(&self) -> bool {
        self.matches_seen == 0 && self.snapshots_written == 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Run {} ({})", self.run_id, self.mode)?;
        match (self.gap_date, self.resume_date) {
            (Some(gap), Some(resume)) => {
                writeln!(f, "  earliest unrated match: {}", gap)?;
                writeln!(f, "  resumed from:           {}", resume)?;
            }
            (None, Some(resume)) => writeln!(f, "  resumed from:           {}", resume)?,
            _ => {}
        }
        if self.is_noop() {
            writeln!(f, "  nothing to process")?;
        }
        writeln!(f, "  teams seeded:           {}", self.teams_seeded)?;
        writeln!(f, "  matches seen:           {}", self.matches_seen)?;
        writeln!(f, "  matches processed:      {}", self.processed())?;
        writeln!(f, "  snapshots written:      {}", self.snapshots_written)?;
        writeln!(
            f,
            "  errors:                 {} ({} skipped, {} undated, {} data defects)",
            self.errors(),
            self.skipped,
            self.undated,
            self.data_defects
        )?;
        if let Some(last) = self.last_committed {
            writeln!(f, "  last committed match:   {}", last)?;
        }
        if self.stopped_early {
            writeln!(f, "  stopped early at a batch boundary")?;
        }
        writeln!(f, "  teams rated:            {}", self.teams_rated)?;
        write!(
            f,
            "  duration:               {} ms",
            (self.finished_at - self.started_at).num_milliseconds()
        )?;

        if !self.leaderboard.is_empty() {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "{}", render_leaderboard(&self.leaderboard))?;
        }
        Ok(())
    }
}

/// Format ranked entries as a plain text table
pub fn render_leaderboard(entries: &[LeaderboardEntry]) -> String {
    let width = entries
        .iter()
        .map(|entry| entry.team.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut out = format!("{:>4}  {:<width$}  {:>6}\n", "Rank", "Team", "Rating");
    for entry in entries {
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>6}\n",
            entry.rank, entry.team, entry.rating
        ));
    }
    out
}
