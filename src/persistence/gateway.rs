//! Batch persistence gateway
//!
//! Buffers snapshots produced by the processor and commits them in bounded
//! batches. A batch that still fails after the configured attempts halts the
//! run; its snapshots stay buffered and are never dropped, so the matches they
//! describe remain unrated and get picked up by the next resume.

use super::repository::SnapshotRepository;
use crate::config::AppConfig;
use crate::error::{RatingError, Result};
use crate::metrics::{CommitStatus, EngineMetrics};
use crate::types::{MatchId, RatingSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Configuration for batched commits
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub batch_size: usize,
    /// Total attempts per batch, the first one included
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_attempts: 2,
            retry_delay: Duration::from_millis(250),
        }
    }
}

impl From<&AppConfig> for GatewayConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            batch_size: config.engine.batch_size,
            max_attempts: config.engine.max_commit_attempts,
            retry_delay: config.retry_delay(),
        }
    }
}

/// Buffers snapshots and commits them atomically in bounded batches
pub struct BatchGateway {
    repository: Arc<dyn SnapshotRepository>,
    config: GatewayConfig,
    metrics: Option<Arc<EngineMetrics>>,
    buffer: Vec<RatingSnapshot>,
    committed: usize,
    batches_committed: usize,
    last_committed: Option<MatchId>,
}

impl BatchGateway {
    pub fn new(repository: Arc<dyn SnapshotRepository>, config: GatewayConfig) -> Self {
        let capacity = config.batch_size.max(1);
        Self {
            repository,
            config,
            metrics: None,
            buffer: Vec::with_capacity(capacity),
            committed: 0,
            batches_committed: 0,
            last_committed: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Buffer a snapshot; commits when the batch is full
    ///
    /// Returns `true` when this call committed a batch.
    pub async fn push(&mut self, snapshot: RatingSnapshot) -> Result<bool> {
        self.buffer.push(snapshot);
        if self.buffer.len() >= self.config.batch_size.max(1) {
            self.commit_buffer().await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Commit whatever is buffered
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.commit_buffer().await
    }

    /// Snapshots buffered but not yet committed
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Snapshots durably committed through this gateway
    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn batches_committed(&self) -> usize {
        self.batches_committed
    }

    /// Last match of the last committed batch
    pub fn last_committed(&self) -> Option<MatchId> {
        self.last_committed
    }

    async fn commit_buffer(&mut self) -> Result<()> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();

            match self.repository.commit_batch(&self.buffer).await {
                Ok(()) => {
                    let count = self.buffer.len();
                    self.last_committed = self.buffer.last().map(|s| s.match_id);
                    self.committed += count;
                    self.batches_committed += 1;
                    self.buffer.clear();

                    if let Some(metrics) = &self.metrics {
                        metrics.record_batch_commit(CommitStatus::Success, started.elapsed());
                        metrics.record_snapshots_committed(count);
                    }

                    debug!(
                        "Committed batch {} - {} snapshots, last match {:?}, attempt {}",
                        self.batches_committed, count, self.last_committed, attempt
                    );
                    return Ok(());
                }
                Err(e) if attempt < max_attempts => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_batch_commit(CommitStatus::Retry, started.elapsed());
                    }
                    warn!(
                        "Batch commit attempt {}/{} failed for {} snapshots: {}. Retrying in {:?}",
                        attempt,
                        max_attempts,
                        self.buffer.len(),
                        e,
                        self.config.retry_delay
                    );
                    sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_batch_commit(CommitStatus::Failed, started.elapsed());
                    }
                    error!(
                        "Batch commit failed after {} attempts, {} snapshots not written: {}",
                        attempt,
                        self.buffer.len(),
                        e
                    );
                    return Err(RatingError::PersistenceFailed {
                        attempts: attempt,
                        last_committed: self.last_committed,
                        message: e.to_string(),
                    }
                    .into());
                }
            }
        }
    }
}

impl std::fmt::Debug for BatchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchGateway")
            .field("config", &self.config)
            .field("pending", &self.buffer.len())
            .field("committed", &self.committed)
            .field("last_committed", &self.last_committed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::repository::{InMemorySnapshotRepository, MockSnapshotRepository};
    use crate::types::{MatchClassification, MatchOutcome};
    use chrono::NaiveDate;

    fn snapshot(match_id: MatchId) -> RatingSnapshot {
        RatingSnapshot {
            match_id,
            date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            team_a: "Kenya".to_string(),
            team_b: "Canada".to_string(),
            classification: MatchClassification::International,
            outcome: MatchOutcome::NoResult,
            rating_a: 1200,
            rating_b: 1200,
        }
    }

    fn config(batch_size: usize) -> GatewayConfig {
        GatewayConfig {
            batch_size,
            max_attempts: 2,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_commits_at_batch_boundary() {
        let repo = Arc::new(InMemorySnapshotRepository::new());
        let mut gateway = BatchGateway::new(repo.clone(), config(3));

        assert!(!gateway.push(snapshot(1)).await.unwrap());
        assert!(!gateway.push(snapshot(2)).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);

        assert!(gateway.push(snapshot(3)).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(gateway.pending(), 0);
        assert_eq!(gateway.last_committed(), Some(3));

        gateway.push(snapshot(4)).await.unwrap();
        gateway.flush().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 4);
        assert_eq!(gateway.committed(), 4);
        assert_eq!(gateway.batches_committed(), 2);
        assert_eq!(repo.commit_count(), 2);
    }

    #[tokio::test]
    async fn test_flush_empty_is_noop() {
        let repo = Arc::new(InMemorySnapshotRepository::new());
        let mut gateway = BatchGateway::new(repo.clone(), config(10));
        gateway.flush().await.unwrap();
        assert_eq!(repo.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_retries_once_then_succeeds() {
        let mut repo = MockSnapshotRepository::new();
        let mut calls = 0;
        repo.expect_commit_batch().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(anyhow::anyhow!("connection reset"))
            } else {
                Ok(())
            }
        });

        let metrics = Arc::new(EngineMetrics::new().unwrap());
        let mut gateway =
            BatchGateway::new(Arc::new(repo), config(2)).with_metrics(metrics.clone());
        gateway.push(snapshot(1)).await.unwrap();
        gateway.push(snapshot(2)).await.unwrap();

        assert_eq!(gateway.committed(), 2);
        assert_eq!(metrics.snapshots_written_total.get(), 2);
        assert_eq!(
            metrics
                .batch_commits_total
                .with_label_values(&["retry"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_persistent_failure_halts_and_keeps_buffer() {
        let mut repo = MockSnapshotRepository::new();
        let mut calls = 0;
        repo.expect_commit_batch().returning(move |batch| {
            calls += 1;
            // First batch lands, every later commit fails
            if calls == 1 && batch.len() == 2 {
                Ok(())
            } else {
                Err(anyhow::anyhow!("disk full"))
            }
        });

        let mut gateway = BatchGateway::new(Arc::new(repo), config(2));
        gateway.push(snapshot(1)).await.unwrap();
        gateway.push(snapshot(2)).await.unwrap();
        gateway.push(snapshot(3)).await.unwrap();

        let err = gateway.push(snapshot(4)).await.unwrap_err();
        match err.downcast_ref::<RatingError>() {
            Some(RatingError::PersistenceFailed {
                attempts,
                last_committed,
                ..
            }) => {
                assert_eq!(*attempts, 2);
                assert_eq!(*last_committed, Some(2));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(gateway.pending(), 2);
        assert_eq!(gateway.committed(), 2);
    }
}
