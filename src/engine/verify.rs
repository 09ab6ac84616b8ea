//! Snapshot verification
//!
//! Compares the persisted table against a fresh in-memory replay of the whole
//! match log.

use crate::types::{MatchId, Rating, RatingSnapshot};
use crate::utils::rating_difference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A persisted snapshot that differs from the replayed one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMismatch {
    pub match_id: MatchId,
    pub expected: RatingSnapshot,
    pub stored: RatingSnapshot,
}

impl SnapshotMismatch {
    /// Largest rating difference between the two snapshots
    pub fn drift(&self) -> Rating {
        rating_difference(self.expected.rating_a, self.stored.rating_a)
            .max(rating_difference(self.expected.rating_b, self.stored.rating_b))
    }
}

/// Result of comparing stored snapshots with a full replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Snapshots produced by the replay
    pub checked: usize,
    pub matching: usize,
    pub mismatched: Vec<SnapshotMismatch>,
    /// Replayed matches with no stored snapshot
    pub missing: Vec<MatchId>,
    /// Stored snapshots no replayed match accounts for
    pub orphaned: Vec<MatchId>,
}

impl VerificationReport {
    /// Compare both tables, keyed by match id
    pub fn compare(expected: &[RatingSnapshot], stored: &[RatingSnapshot]) -> Self {
        let stored: BTreeMap<MatchId, &RatingSnapshot> =
            stored.iter().map(|s| (s.match_id, s)).collect();
        let mut report = Self {
            checked: expected.len(),
            ..Self::default()
        };

        let mut seen = Vec::with_capacity(expected.len());
        for snapshot in expected {
            seen.push(snapshot.match_id);
            match stored.get(&snapshot.match_id) {
                Some(found) if *found == snapshot => report.matching += 1,
                Some(found) => report.mismatched.push(SnapshotMismatch {
                    match_id: snapshot.match_id,
                    expected: snapshot.clone(),
                    stored: (*found).clone(),
                }),
                None => report.missing.push(snapshot.match_id),
            }
        }

        seen.sort_unstable();
        report.orphaned = stored
            .keys()
            .filter(|id| seen.binary_search(id).is_err())
            .copied()
            .collect();

        report
    }

    pub fn is_consistent(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty() && self.orphaned.is_empty()
    }
}

impl std::fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Verified {} snapshots", self.checked)?;
        writeln!(f, "  matching:   {}", self.matching)?;
        writeln!(f, "  mismatched: {}", self.mismatched.len())?;
        writeln!(f, "  missing:    {}", self.missing.len())?;
        write!(f, "  orphaned:   {}", self.orphaned.len())?;

        for mismatch in self.mismatched.iter().take(10) {
            write!(
                f,
                "\n  match {} (drift {}): expected {} {} / {} {}, stored {} {} / {} {}",
                mismatch.match_id,
                mismatch.drift(),
                mismatch.expected.team_a,
                mismatch.expected.rating_a,
                mismatch.expected.team_b,
                mismatch.expected.rating_b,
                mismatch.stored.team_a,
                mismatch.stored.rating_a,
                mismatch.stored.team_b,
                mismatch.stored.rating_b
            )?;
        }
        Ok(())
    }
}
