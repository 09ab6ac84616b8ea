//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for rating runs and snapshot
//! persistence using Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one batch commit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Success,
    Retry,
    Failed,
}

impl CommitStatus {
    fn as_label(self) -> &'static str {
        match self {
            CommitStatus::Success => "success",
            CommitStatus::Retry => "retry",
            CommitStatus::Failed => "failed",
        }
    }
}

/// Main metrics collector for the rating engine
#[derive(Clone)]
pub struct EngineMetrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Matches whose snapshot has been committed
    pub matches_processed_total: IntCounter,

    /// Snapshots durably written
    pub snapshots_written_total: IntCounter,

    /// Winner names that matched neither participant
    pub data_defects_total: IntCounter,

    /// Malformed records skipped without a snapshot
    pub records_skipped_total: IntCounter,

    /// Batch commit attempts by status
    pub batch_commits_total: IntCounterVec,

    /// Batch commit duration
    pub batch_commit_duration: Histogram,

    /// Teams in the running rating state at the end of the last run
    pub teams_rated: IntGauge,

    /// Runs by mode and result
    pub runs_total: IntCounterVec,
}

impl EngineMetrics {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let matches_processed_total = IntCounter::new(
            "cricket_ratings_matches_processed_total",
            "Matches whose pre-match snapshot has been committed",
        )?;
        registry.register(Box::new(matches_processed_total.clone()))?;

        let snapshots_written_total = IntCounter::new(
            "cricket_ratings_snapshots_written_total",
            "Rating snapshots durably written",
        )?;
        registry.register(Box::new(snapshots_written_total.clone()))?;

        let data_defects_total = IntCounter::new(
            "cricket_ratings_data_defects_total",
            "Declared winners matching neither participant",
        )?;
        registry.register(Box::new(data_defects_total.clone()))?;

        let records_skipped_total = IntCounter::new(
            "cricket_ratings_records_skipped_total",
            "Malformed match records skipped",
        )?;
        registry.register(Box::new(records_skipped_total.clone()))?;

        let batch_commits_total = IntCounterVec::new(
            Opts::new(
                "cricket_ratings_batch_commits_total",
                "Snapshot batch commit attempts",
            ),
            &["status"],
        )?;
        registry.register(Box::new(batch_commits_total.clone()))?;

        let batch_commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "cricket_ratings_batch_commit_duration_seconds",
                "Snapshot batch commit duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(batch_commit_duration.clone()))?;

        let teams_rated = IntGauge::new(
            "cricket_ratings_teams_rated",
            "Teams in the running rating state",
        )?;
        registry.register(Box::new(teams_rated.clone()))?;

        let runs_total = IntCounterVec::new(
            Opts::new("cricket_ratings_runs_total", "Rating runs"),
            &["mode", "result"],
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        Ok(Self {
            registry,
            matches_processed_total,
            snapshots_written_total,
            data_defects_total,
            records_skipped_total,
            batch_commits_total,
            batch_commit_duration,
            teams_rated,
            runs_total,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record a committed batch of snapshots
    pub fn record_snapshots_committed(&self, count: usize) {
        self.snapshots_written_total.inc_by(count as u64);
        self.matches_processed_total.inc_by(count as u64);
    }

    pub fn record_data_defect(&self) {
        self.data_defects_total.inc();
    }

    pub fn record_skipped_record(&self) {
        self.records_skipped_total.inc();
    }

    /// Record one commit attempt
    pub fn record_batch_commit(&self, status: CommitStatus, duration: Duration) {
        self.batch_commits_total
            .with_label_values(&[status.as_label()])
            .inc();
        self.batch_commit_duration.observe(duration.as_secs_f64());
    }

    pub fn set_teams_rated(&self, teams: usize) {
        self.teams_rated.set(teams as i64);
    }

    /// Record the end of a run
    pub fn record_run(&self, mode: &str, success: bool) {
        let result = if success { "success" } else { "failed" };
        self.runs_total.with_label_values(&[mode, result]).inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("matches_processed", &self.matches_processed_total.get())
            .field("snapshots_written", &self.snapshots_written_total.get())
            .finish()
    }
}
