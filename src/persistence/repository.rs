//! Snapshot repository interface and in-memory implementation

use crate::error::{RatingError, Result};
use crate::types::{MatchId, RatingHistoryPoint, RatingSnapshot};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

/// Trait for snapshot storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Upsert every snapshot of the batch, or none of them
    async fn commit_batch(&self, batch: &[RatingSnapshot]) -> Result<()>;

    /// Get the snapshot of one match
    async fn get(&self, match_id: MatchId) -> Result<Option<RatingSnapshot>>;

    /// Every snapshot in `(date, id)` order
    async fn all_snapshots(&self) -> Result<Vec<RatingSnapshot>>;

    /// Ids of all matches that have a snapshot
    async fn rated_match_ids(&self) -> Result<HashSet<MatchId>> {
        Ok(self
            .all_snapshots()
            .await?
            .into_iter()
            .map(|snapshot| snapshot.match_id)
            .collect())
    }

    /// Snapshots dated strictly before `date`, in `(date, id)` order
    async fn snapshots_before(&self, date: NaiveDate) -> Result<Vec<RatingSnapshot>> {
        Ok(self
            .all_snapshots()
            .await?
            .into_iter()
            .filter(|snapshot| snapshot.date < date)
            .collect())
    }

    /// Pre-match rating trajectory of one canonical team
    async fn team_history(&self, team: &str) -> Result<Vec<RatingHistoryPoint>> {
        Ok(self
            .all_snapshots()
            .await?
            .into_iter()
            .filter_map(|snapshot| {
                let (rating, opponent) = if snapshot.team_a == team {
                    (snapshot.rating_a, snapshot.team_b.clone())
                } else if snapshot.team_b == team {
                    (snapshot.rating_b, snapshot.team_a.clone())
                } else {
                    return None;
                };
                Some(RatingHistoryPoint {
                    match_id: snapshot.match_id,
                    date: snapshot.date,
                    opponent,
                    pre_match_rating: rating,
                })
            })
            .collect())
    }

    /// Number of stored snapshots
    async fn count(&self) -> Result<usize> {
        Ok(self.all_snapshots().await?.len())
    }
}

/// Sort snapshots into `(date, id)` order
pub(crate) fn sort_snapshots(snapshots: &mut [RatingSnapshot]) {
    snapshots.sort_by_key(|snapshot| snapshot.sort_key());
}

/// In-memory snapshot repository
#[derive(Debug, Default)]
pub struct InMemorySnapshotRepository {
    snapshots: RwLock<BTreeMap<MatchId, RatingSnapshot>>,
    commits: RwLock<usize>,
}

impl InMemorySnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful batch commits (for testing)
    pub fn commit_count(&self) -> usize {
        self.commits.read().map(|c| *c).unwrap_or(0)
    }

    /// Remove snapshots, simulating matches that were never rated
    pub fn remove(&self, match_ids: &[MatchId]) -> Result<usize> {
        let mut snapshots =
            self.snapshots
                .write()
                .map_err(|_| RatingError::InternalError {
                    message: "Failed to acquire snapshots write lock".to_string(),
                })?;

        Ok(match_ids
            .iter()
            .filter(|id| snapshots.remove(id).is_some())
            .count())
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotRepository {
    async fn commit_batch(&self, batch: &[RatingSnapshot]) -> Result<()> {
        let mut snapshots =
            self.snapshots
                .write()
                .map_err(|_| RatingError::InternalError {
                    message: "Failed to acquire snapshots write lock".to_string(),
                })?;

        for snapshot in batch {
            snapshots.insert(snapshot.match_id, snapshot.clone());
        }

        drop(snapshots);
        if let Ok(mut commits) = self.commits.write() {
            *commits += 1;
        }
        Ok(())
    }

    async fn get(&self, match_id: MatchId) -> Result<Option<RatingSnapshot>> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire snapshots read lock".to_string(),
            })?;

        Ok(snapshots.get(&match_id).cloned())
    }

    async fn all_snapshots(&self) -> Result<Vec<RatingSnapshot>> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire snapshots read lock".to_string(),
            })?;

        let mut all: Vec<RatingSnapshot> = snapshots.values().cloned().collect();
        sort_snapshots(&mut all);
        Ok(all)
    }

    async fn rated_match_ids(&self) -> Result<HashSet<MatchId>> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire snapshots read lock".to_string(),
            })?;

        Ok(snapshots.keys().copied().collect())
    }

    async fn count(&self) -> Result<usize> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire snapshots read lock".to_string(),
            })?;

        Ok(snapshots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchClassification, MatchOutcome};

    fn snapshot(match_id: MatchId, day: u32, team_a: &str, team_b: &str) -> RatingSnapshot {
        RatingSnapshot {
            match_id,
            date: NaiveDate::from_ymd_opt(2015, 2, day).unwrap(),
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            classification: MatchClassification::International,
            outcome: MatchOutcome::TeamAWon,
            rating_a: 1500 + match_id as i64,
            rating_b: 1500 - match_id as i64,
        }
    }

    #[tokio::test]
    async fn test_commit_and_get() {
        let repo = InMemorySnapshotRepository::new();
        repo.commit_batch(&[snapshot(1, 14, "India", "Pakistan")])
            .await
            .unwrap();

        let stored = repo.get(1).await.unwrap().unwrap();
        assert_eq!(stored.team_a, "India");
        assert!(repo.get(2).await.unwrap().is_none());
        assert_eq!(repo.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_overwrites() {
        let repo = InMemorySnapshotRepository::new();
        repo.commit_batch(&[snapshot(1, 14, "India", "Pakistan")])
            .await
            .unwrap();

        let mut updated = snapshot(1, 14, "India", "Pakistan");
        updated.rating_a = 1600;
        repo.commit_batch(&[updated]).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get(1).await.unwrap().unwrap().rating_a, 1600);
    }

    #[tokio::test]
    async fn test_ordering_and_before() {
        let repo = InMemorySnapshotRepository::new();
        repo.commit_batch(&[
            snapshot(5, 20, "India", "Pakistan"),
            snapshot(2, 15, "Australia", "England"),
            snapshot(3, 15, "India", "South Africa"),
        ])
        .await
        .unwrap();

        let ids: Vec<MatchId> = repo
            .all_snapshots()
            .await
            .unwrap()
            .iter()
            .map(|s| s.match_id)
            .collect();
        assert_eq!(ids, vec![2, 3, 5]);

        let before = repo
            .snapshots_before(NaiveDate::from_ymd_opt(2015, 2, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(before.len(), 2);
    }

    #[tokio::test]
    async fn test_team_history() {
        let repo = InMemorySnapshotRepository::new();
        repo.commit_batch(&[
            snapshot(1, 14, "India", "Pakistan"),
            snapshot(2, 15, "Australia", "England"),
            snapshot(3, 22, "South Africa", "India"),
        ])
        .await
        .unwrap();

        let history = repo.team_history("India").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].opponent, "Pakistan");
        assert_eq!(history[0].pre_match_rating, 1501);
        assert_eq!(history[1].opponent, "South Africa");
        assert_eq!(history[1].pre_match_rating, 1497);
    }

    #[tokio::test]
    async fn test_remove() {
        let repo = InMemorySnapshotRepository::new();
        repo.commit_batch(&[
            snapshot(1, 14, "India", "Pakistan"),
            snapshot(2, 15, "Australia", "England"),
        ])
        .await
        .unwrap();

        assert_eq!(repo.remove(&[2, 9]).unwrap(), 1);
        let ids = repo.rated_match_ids().await.unwrap();
        assert!(ids.contains(&1));
        assert!(!ids.contains(&2));
    }
}
