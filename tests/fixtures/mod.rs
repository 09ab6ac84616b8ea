//! Test fixtures and repository doubles for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use cricket_ratings::config::{AppConfig, TeamTables};
use cricket_ratings::engine::ResumeCoordinator;
use cricket_ratings::error::Result;
use cricket_ratings::persistence::{InMemorySnapshotRepository, SnapshotRepository};
use cricket_ratings::source::MatchSource;
use cricket_ratings::types::{MatchClassification, MatchId, MatchRecord, RatingSnapshot};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn league_match(
    id: MatchId,
    day: NaiveDate,
    team_a: &str,
    team_b: &str,
    winner: Option<&str>,
) -> MatchRecord {
    MatchRecord::new(id, day, team_a, team_b, MatchClassification::Domestic, winner)
}

pub fn international_match(
    id: MatchId,
    day: NaiveDate,
    team_a: &str,
    team_b: &str,
    winner: Option<&str>,
) -> MatchRecord {
    MatchRecord::new(
        id,
        day,
        team_a,
        team_b,
        MatchClassification::International,
        winner,
    )
}

/// Tables with the alias used by the worked rating example
pub fn test_tables() -> TeamTables {
    let mut tables = TeamTables::default();
    tables.version = "test".to_string();
    tables
        .aliases
        .insert("RCB-old-name".to_string(), "RCB".to_string());
    tables
}

/// Small batches and no retry delay so failures surface quickly
pub fn test_config(batch_size: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.engine.batch_size = batch_size;
    config.engine.retry_delay_ms = 0;
    config
}

/// A mixed season of league and international fixtures over several weeks
pub fn sample_history() -> Vec<MatchRecord> {
    let teams_league = [
        "Mumbai Indians",
        "Chennai Super Kings",
        "RCB",
        "Kolkata Knight Riders",
        "Delhi Capitals",
        "Punjab Kings",
    ];
    let teams_international = [
        "India",
        "Australia",
        "England",
        "Afghanistan",
        "Ireland",
        "Nepal",
        "Scotland",
    ];

    let mut records = Vec::new();
    let mut id = 1000;
    for week in 0..8u32 {
        for slot in 0..3usize {
            let day = date(2023, 4, 1 + week * 3 + (slot as u32 % 3));
            let a = teams_league[(week as usize + slot) % teams_league.len()];
            let b = teams_league[(week as usize + slot + 1 + slot) % teams_league.len()];
            let winner = match (week as usize + slot) % 4 {
                0 => Some(a),
                1 | 2 => Some(b),
                _ => None,
            };
            if a != b {
                records.push(league_match(id, day, a, b, winner));
                id += 1;
            }

            let x = teams_international[(week as usize * 2 + slot) % teams_international.len()];
            let y =
                teams_international[(week as usize * 3 + slot + 2) % teams_international.len()];
            let winner = if (week as usize + slot) % 3 == 0 {
                Some(y)
            } else {
                Some(x)
            };
            if x != y {
                records.push(international_match(id, day, x, y, winner));
                id += 1;
            }
        }
    }
    records
}

pub fn coordinator(
    source: Arc<dyn MatchSource>,
    repository: Arc<dyn SnapshotRepository>,
    batch_size: usize,
) -> ResumeCoordinator {
    ResumeCoordinator::new(&test_config(batch_size), &test_tables(), source, repository)
        .expect("valid test configuration")
}

/// Repository that starts failing every commit after a number of good ones
#[derive(Debug, Default)]
pub struct FlakySnapshotRepository {
    inner: InMemorySnapshotRepository,
    successful_commits: Option<usize>,
    commits: AtomicUsize,
    attempts: AtomicUsize,
    healed: AtomicBool,
}

impl FlakySnapshotRepository {
    /// Allow `successful_commits` batches, fail everything after
    pub fn failing_after(successful_commits: usize) -> Self {
        Self {
            successful_commits: Some(successful_commits),
            ..Self::default()
        }
    }

    /// Stop failing, as if the storage came back
    pub fn heal(&self) {
        self.healed.store(true, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotRepository for FlakySnapshotRepository {
    async fn commit_batch(&self, batch: &[RatingSnapshot]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = !self.healed.load(Ordering::SeqCst)
            && self
                .successful_commits
                .is_some_and(|allowed| self.commits.load(Ordering::SeqCst) >= allowed);
        if failing {
            return Err(anyhow::anyhow!("simulated storage outage"));
        }

        self.inner.commit_batch(batch).await?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, match_id: MatchId) -> Result<Option<RatingSnapshot>> {
        self.inner.get(match_id).await
    }

    async fn all_snapshots(&self) -> Result<Vec<RatingSnapshot>> {
        self.inner.all_snapshots().await
    }
}
