//! Checkpoint and resume coordination
//!
//! An incremental run finds the earliest dated match that has no snapshot
//! (the gap date), steps back by the overlap window, rebuilds every team's
//! rating from the snapshots dated before that point and processes the rest of
//! the log. A full run starts every team from its initial rating. Both produce
//! the same snapshots for the same log.

use super::processor::{resolve_record, ChronologicalProcessor};
use super::replay::reconstruct_ratings;
use super::summary::{RunMode, RunSummary};
use super::verify::VerificationReport;
use crate::config::{validate_config, AppConfig, TeamTables};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::metrics::EngineMetrics;
use crate::persistence::{
    BatchGateway, GatewayConfig, InMemorySnapshotRepository, SnapshotRepository,
};
use crate::rating::{EloOutcomeModel, InitialRatingPolicy, RatingStore};
use crate::source::MatchSource;
use crate::types::{LeaderboardEntry, MatchRecord, RatingHistoryPoint};
use crate::utils::{current_timestamp, generate_run_id, overlap_start};
use chrono::NaiveDate;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Include the top N teams in the summary; `Some(0)` means every team
    pub leaderboard: Option<usize>,
    /// Process into a scratch table instead of the real one
    pub dry_run: bool,
}

/// Drives incremental and full rating runs
pub struct ResumeCoordinator {
    resolver: Arc<IdentityResolver>,
    policy: InitialRatingPolicy,
    model: EloOutcomeModel,
    source: Arc<dyn MatchSource>,
    repository: Arc<dyn SnapshotRepository>,
    gateway_config: GatewayConfig,
    overlap_days: i64,
    metrics: Arc<EngineMetrics>,
    stop: Arc<AtomicBool>,
}

impl ResumeCoordinator {
    /// Build a coordinator, failing fast on invalid configuration or tables
    pub fn new(
        config: &AppConfig,
        tables: &TeamTables,
        source: Arc<dyn MatchSource>,
        repository: Arc<dyn SnapshotRepository>,
    ) -> Result<Self> {
        validate_config(config)?;
        tables.validate()?;

        let resolver = IdentityResolver::new(tables);
        info!(
            "Team tables '{}': {} aliases, {} ranked teams",
            tables.version,
            resolver.alias_count(),
            tables.rankings.len()
        );

        Ok(Self {
            resolver: Arc::new(resolver),
            policy: InitialRatingPolicy::new(config.rating.clone(), tables),
            model: EloOutcomeModel::from_settings(&config.engine),
            source,
            repository,
            gateway_config: GatewayConfig::from(config),
            overlap_days: config.engine.resume_overlap_days,
            metrics: Arc::new(EngineMetrics::default()),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Flag that ends a run at the next batch boundary once set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Earliest dated, processable match with no snapshot
    ///
    /// Undated and malformed records never receive a snapshot and are
    /// ignored here.
    pub async fn earliest_unrated_date(&self) -> Result<Option<NaiveDate>> {
        let records = self.source.all_matches().await?;
        self.unrated_gap(&records).await
    }

    async fn unrated_gap(&self, records: &[MatchRecord]) -> Result<Option<NaiveDate>> {
        let rated = self.repository.rated_match_ids().await?;
        Ok(records
            .iter()
            .filter(|record| !rated.contains(&record.id))
            .filter_map(|record| resolve_record(record, &self.resolver).ok())
            .map(|resolved| resolved.date)
            .min())
    }

    /// Report records that cannot be placed on the timeline
    ///
    /// Both run modes count them the same way, independent of the resume point.
    fn note_undated(&self, records: &[MatchRecord]) -> usize {
        let mut undated = 0;
        for record in records.iter().filter(|record| record.date.is_none()) {
            match &record.parse_error {
                Some(reason) => warn!("Skipping undated match {}: {}", record.id, reason),
                None => warn!("Skipping undated match {}", record.id),
            }
            self.metrics.record_skipped_record();
            undated += 1;
        }
        undated
    }

    /// Running ratings as of the start of `resume_date`
    ///
    /// With no date every stored snapshot is used, giving the current state.
    pub async fn reconstruct_state(&self, resume_date: Option<NaiveDate>) -> Result<RatingStore> {
        let snapshots = match resume_date {
            Some(date) => self.repository.snapshots_before(date).await?,
            None => self.repository.all_snapshots().await?,
        };

        let ratings = reconstruct_ratings(&snapshots, &self.model);
        info!(
            "Reconstructed {} team ratings from {} snapshots",
            ratings.len(),
            snapshots.len()
        );

        let mut store = RatingStore::new(self.policy.clone());
        store.seed(ratings);
        Ok(store)
    }

    /// Resume from the earliest unrated match
    pub async fn run_incremental(&self, options: &RunOptions) -> Result<RunSummary> {
        let mut summary = RunSummary::new(
            RunMode::Incremental,
            generate_run_id(),
            current_timestamp(),
        );
        info!("Starting incremental run {}", summary.run_id);

        let log = self.source.all_matches().await?;
        summary.undated = self.note_undated(&log);

        let Some(gap_date) = self.unrated_gap(&log).await? else {
            info!("Every match already has a snapshot, nothing to process");
            let store = self.reconstruct_state(None).await?;
            summary.teams_rated = store.len();
            summary.leaderboard = leaderboard(&store, options);
            summary.finished_at = current_timestamp();
            self.metrics.record_run(RunMode::Incremental.as_str(), true);
            return Ok(summary);
        };

        let resume_date = overlap_start(gap_date, self.overlap_days);
        summary.gap_date = Some(gap_date);
        summary.resume_date = Some(resume_date);
        info!(
            "Earliest unrated match on {}, resuming from {}",
            gap_date, resume_date
        );

        let store = self.reconstruct_state(Some(resume_date)).await?;
        summary.teams_seeded = store.len();

        let records = self.source.matches_from(resume_date).await?;
        self.execute(summary, store, records, options).await
    }

    /// Recompute every snapshot from initial ratings
    pub async fn full_recompute(&self, options: &RunOptions) -> Result<RunSummary> {
        let mut summary = RunSummary::new(RunMode::Full, generate_run_id(), current_timestamp());
        info!("Starting full recompute {}", summary.run_id);

        let mut records = self.source.all_matches().await?;
        summary.undated = self.note_undated(&records);
        records.retain(|record| record.date.is_some());
        let store = RatingStore::new(self.policy.clone());
        self.execute(summary, store, records, options).await
    }

    async fn execute(
        &self,
        mut summary: RunSummary,
        store: RatingStore,
        records: Vec<MatchRecord>,
        options: &RunOptions,
    ) -> Result<RunSummary> {
        let repository: Arc<dyn SnapshotRepository> = if options.dry_run {
            warn!("Dry run: snapshots go to a scratch table and are discarded");
            Arc::new(InMemorySnapshotRepository::new())
        } else {
            self.repository.clone()
        };

        let gateway = BatchGateway::new(repository, self.gateway_config.clone())
            .with_metrics(self.metrics.clone());
        let mut processor =
            ChronologicalProcessor::new(self.resolver.clone(), self.model.clone(), store, gateway)
                .with_metrics(self.metrics.clone())
                .with_stop_signal(self.stop.clone());

        let result = processor.run(&records).await;
        summary.absorb(processor.report());
        summary.finished_at = current_timestamp();

        match result {
            Ok(_) => {
                self.metrics.record_run(summary.mode.as_str(), true);
                summary.teams_rated = processor.store().len();
                summary.leaderboard = leaderboard(processor.store(), options);
                info!(
                    "Run {} finished - {} snapshots written, {} errors",
                    summary.run_id,
                    summary.snapshots_written,
                    summary.errors()
                );
                Ok(summary)
            }
            Err(e) => {
                self.metrics.record_run(summary.mode.as_str(), false);
                error!(
                    "Run {} failed after {} snapshots (last committed match {:?}): {}",
                    summary.run_id, summary.snapshots_written, summary.last_committed, e
                );
                Err(e)
            }
        }
    }

    /// Ranked table of current ratings
    pub async fn current_leaderboard(&self, limit: Option<usize>) -> Result<Vec<LeaderboardEntry>> {
        let store = self.reconstruct_state(None).await?;
        Ok(store.leaderboard(limit))
    }

    /// Pre-match rating trajectory of a team, looked up by any of its names
    pub async fn team_history(&self, name: &str) -> Result<Vec<RatingHistoryPoint>> {
        let team = self.resolver.resolve(name);
        self.repository.team_history(&team).await
    }

    /// Replay the whole log in memory and compare with the stored table
    pub async fn verify_snapshots(&self) -> Result<VerificationReport> {
        let records = self.source.all_matches().await?;
        let scratch = Arc::new(InMemorySnapshotRepository::new());
        let gateway = BatchGateway::new(
            scratch.clone(),
            GatewayConfig {
                batch_size: records.len().max(1),
                ..self.gateway_config.clone()
            },
        );

        let mut processor = ChronologicalProcessor::new(
            self.resolver.clone(),
            self.model.clone(),
            RatingStore::new(self.policy.clone()),
            gateway,
        );
        processor.run(&records).await?;

        let expected = scratch.all_snapshots().await?;
        let stored = self.repository.all_snapshots().await?;
        let report = VerificationReport::compare(&expected, &stored);

        if report.is_consistent() {
            info!("Verified {} snapshots, table is consistent", report.checked);
        } else {
            warn!(
                "Snapshot table drift: {} mismatched, {} missing, {} orphaned",
                report.mismatched.len(),
                report.missing.len(),
                report.orphaned.len()
            );
        }
        Ok(report)
    }
}

fn leaderboard(store: &RatingStore, options: &RunOptions) -> Vec<LeaderboardEntry> {
    match options.leaderboard {
        Some(0) => store.leaderboard(None),
        Some(limit) => store.leaderboard(Some(limit)),
        None => Vec::new(),
    }
}

impl std::fmt::Debug for ResumeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeCoordinator")
            .field("gateway_config", &self.gateway_config)
            .field("overlap_days", &self.overlap_days)
            .finish_non_exhaustive()
    }
}
