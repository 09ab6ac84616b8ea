//! Chronological processor
//!
//! Applies matches to the running rating state one at a time. For every match
//! the two current ratings are captured as the pre-match snapshot before the
//! outcome model moves them, and the snapshot is handed to the batch gateway.

use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::metrics::EngineMetrics;
use crate::persistence::BatchGateway;
use crate::rating::{EloOutcomeModel, RatingStore};
use crate::types::{MatchId, MatchOutcome, MatchRecord, RatingSnapshot, TeamId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of one processing pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorState {
    NotStarted,
    Processing,
    Completed,
    Failed,
}

/// Why a record was skipped without a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDefect {
    /// Source row could not be read in full
    Unreadable(String),
    MissingDate,
    BlankParticipant,
    /// Both sides resolve to the same canonical team
    SelfMatch(TeamId),
    /// Record does not sort after the previously processed one
    OutOfOrder { previous: (NaiveDate, MatchId) },
}

impl std::fmt::Display for RecordDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordDefect::Unreadable(reason) => write!(f, "unreadable row ({})", reason),
            RecordDefect::MissingDate => write!(f, "missing date"),
            RecordDefect::BlankParticipant => write!(f, "blank participant name"),
            RecordDefect::SelfMatch(team) => write!(f, "both participants resolve to '{}'", team),
            RecordDefect::OutOfOrder { previous } => write!(
                f,
                "out of order after match {} on {}",
                previous.1, previous.0
            ),
        }
    }
}

/// A record after identity resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub date: NaiveDate,
    pub team_a: TeamId,
    pub team_b: TeamId,
    pub outcome: MatchOutcome,
    /// Canonical winner that matched neither participant
    pub unmatched_winner: Option<TeamId>,
}

/// Resolve participants and the declared winner of a record
///
/// A winner naming neither side becomes a no result; the caller decides how
/// to report it.
pub fn resolve_record(
    record: &MatchRecord,
    resolver: &IdentityResolver,
) -> std::result::Result<ResolvedMatch, RecordDefect> {
    if let Some(reason) = &record.parse_error {
        return Err(RecordDefect::Unreadable(reason.clone()));
    }
    let date = record.date.ok_or(RecordDefect::MissingDate)?;
    if record.team_a.trim().is_empty() || record.team_b.trim().is_empty() {
        return Err(RecordDefect::BlankParticipant);
    }

    let team_a = resolver.resolve(&record.team_a);
    let team_b = resolver.resolve(&record.team_b);
    if team_a == team_b {
        return Err(RecordDefect::SelfMatch(team_a));
    }

    let (outcome, unmatched_winner) = match record.winner.as_deref() {
        None => (MatchOutcome::NoResult, None),
        Some(raw) if raw.trim().is_empty() => (MatchOutcome::NoResult, None),
        Some(raw) => {
            let winner = resolver.resolve(raw);
            if winner == team_a {
                (MatchOutcome::TeamAWon, None)
            } else if winner == team_b {
                (MatchOutcome::TeamBWon, None)
            } else {
                (MatchOutcome::NoResult, Some(winner))
            }
        }
    };

    Ok(ResolvedMatch {
        date,
        team_a,
        team_b,
        outcome,
        unmatched_winner,
    })
}

/// Counters for one processing pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingReport {
    /// Records handed to the processor
    pub matches_seen: usize,
    /// Snapshots durably committed
    pub snapshots_written: usize,
    /// Malformed records skipped without a snapshot
    pub skipped: usize,
    /// Winners matching neither participant, rated as no result
    pub data_defects: usize,
    pub last_committed: Option<MatchId>,
    /// Stop was requested and honoured at a batch boundary
    pub stopped_early: bool,
}

impl ProcessingReport {
    pub fn errors(&self) -> usize {
        self.skipped + self.data_defects
    }
}

/// Sequential rating processor, owner of the running rating state
pub struct ChronologicalProcessor {
    resolver: Arc<IdentityResolver>,
    model: EloOutcomeModel,
    store: RatingStore,
    gateway: BatchGateway,
    metrics: Option<Arc<EngineMetrics>>,
    stop: Option<Arc<AtomicBool>>,
    state: ProcessorState,
    report: ProcessingReport,
    last_key: Option<(NaiveDate, MatchId)>,
}

impl ChronologicalProcessor {
    pub fn new(
        resolver: Arc<IdentityResolver>,
        model: EloOutcomeModel,
        store: RatingStore,
        gateway: BatchGateway,
    ) -> Self {
        Self {
            resolver,
            model,
            store,
            gateway,
            metrics: None,
            stop: None,
            state: ProcessorState::NotStarted,
            report: ProcessingReport::default(),
            last_key: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Flag checked between batches; setting it ends the run early
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn report(&self) -> &ProcessingReport {
        &self.report
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }

    /// Apply one match to the running state
    ///
    /// Returns the snapshot handed to the gateway, or `None` when the record
    /// was skipped. Errors are persistence failures only.
    pub async fn process_match(&mut self, record: &MatchRecord) -> Result<Option<RatingSnapshot>> {
        self.report.matches_seen += 1;

        let resolved = match self.check_order(record).and_then(|_| {
            resolve_record(record, &self.resolver)
        }) {
            Ok(resolved) => resolved,
            Err(defect) => {
                warn!("Skipping match {}: {}", record.id, defect);
                self.report.skipped += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.record_skipped_record();
                }
                return Ok(None);
            }
        };

        if let Some(winner) = &resolved.unmatched_winner {
            warn!(
                "Match {} on {}: declared winner '{}' is neither '{}' nor '{}', rating as no result",
                record.id, resolved.date, winner, resolved.team_a, resolved.team_b
            );
            self.report.data_defects += 1;
            if let Some(metrics) = &self.metrics {
                metrics.record_data_defect();
            }
        }

        let rating_a = self.store.get(&resolved.team_a, record.classification);
        let rating_b = self.store.get(&resolved.team_b, record.classification);

        let snapshot = RatingSnapshot {
            match_id: record.id,
            date: resolved.date,
            team_a: resolved.team_a.clone(),
            team_b: resolved.team_b.clone(),
            classification: record.classification,
            outcome: resolved.outcome,
            rating_a,
            rating_b,
        };

        let (delta_a, delta_b) =
            self.model
                .compute_deltas(rating_a, rating_b, resolved.outcome, record.classification);
        self.store.set(&resolved.team_a, rating_a + delta_a);
        self.store.set(&resolved.team_b, rating_b + delta_b);
        self.last_key = Some((resolved.date, record.id));

        debug!(
            "Match {} on {}: {} {} ({:+}) vs {} {} ({:+}), {:?}",
            record.id,
            resolved.date,
            resolved.team_a,
            rating_a,
            delta_a,
            resolved.team_b,
            rating_b,
            delta_b,
            resolved.outcome
        );

        self.gateway.push(snapshot.clone()).await?;
        self.report.snapshots_written = self.gateway.committed();
        self.report.last_committed = self.gateway.last_committed();

        Ok(Some(snapshot))
    }

    fn check_order(&self, record: &MatchRecord) -> std::result::Result<(), RecordDefect> {
        let (Some(previous), Some(date)) = (self.last_key, record.date) else {
            return Ok(());
        };
        if (date, record.id) <= previous {
            return Err(RecordDefect::OutOfOrder { previous });
        }
        Ok(())
    }

    /// Process every record in order, then flush the final partial batch
    pub async fn run(&mut self, records: &[MatchRecord]) -> Result<ProcessingReport> {
        self.state = ProcessorState::Processing;
        info!("Processing {} match records", records.len());

        for record in records {
            if self.gateway.pending() == 0 && self.stop_requested() {
                info!(
                    "Stop requested, ending run at batch boundary after match {:?}",
                    self.gateway.last_committed()
                );
                self.report.stopped_early = true;
                break;
            }

            if let Err(e) = self.process_match(record).await {
                self.state = ProcessorState::Failed;
                return Err(e);
            }
        }

        if let Err(e) = self.gateway.flush().await {
            self.state = ProcessorState::Failed;
            return Err(e);
        }
        self.report.snapshots_written = self.gateway.committed();
        self.report.last_committed = self.gateway.last_committed();

        if let Some(metrics) = &self.metrics {
            metrics.set_teams_rated(self.store.len());
        }

        self.state = ProcessorState::Completed;
        info!(
            "Processing completed - seen: {}, written: {}, skipped: {}, data defects: {}",
            self.report.matches_seen,
            self.report.snapshots_written,
            self.report.skipped,
            self.report.data_defects
        );
        Ok(self.report.clone())
    }
}

impl std::fmt::Debug for ChronologicalProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChronologicalProcessor")
            .field("state", &self.state)
            .field("teams", &self.store.len())
            .field("report", &self.report)
            .finish()
    }
}
