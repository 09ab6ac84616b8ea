//! JSON file snapshot repository
//!
//! The whole table lives in one JSON document. Each batch commit writes the
//! merged table to a sibling temp file and renames it over the original, so a
//! crash mid-commit leaves the previous table intact.

use super::repository::{sort_snapshots, SnapshotRepository};
use crate::error::{RatingError, Result};
use crate::types::{MatchId, RatingSnapshot};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Snapshot table persisted as a JSON file
#[derive(Debug)]
pub struct JsonFileSnapshotRepository {
    path: PathBuf,
    snapshots: Mutex<BTreeMap<MatchId, RatingSnapshot>>,
}

impl JsonFileSnapshotRepository {
    /// Open the table at `path`, starting empty when the file does not exist
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let snapshots = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let stored: Vec<RatingSnapshot> =
                    serde_json::from_slice(&bytes).map_err(|e| RatingError::Storage {
                        message: format!("Corrupt snapshot table {}: {}", path.display(), e),
                    })?;
                stored.into_iter().map(|s| (s.match_id, s)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(RatingError::Storage {
                    message: format!("Failed to read snapshot table {}: {}", path.display(), e),
                }
                .into())
            }
        };

        info!(
            "Opened snapshot table {} with {} snapshots",
            path.display(),
            snapshots.len()
        );

        Ok(Self {
            path,
            snapshots: Mutex::new(snapshots),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_table(&self, table: &BTreeMap<MatchId, RatingSnapshot>) -> Result<()> {
        let mut rows: Vec<&RatingSnapshot> = table.values().collect();
        rows.sort_by_key(|snapshot| snapshot.sort_key());
        let bytes = serde_json::to_vec_pretty(&rows)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RatingError::Storage {
                    message: format!("Failed to create {}: {}", parent.display(), e),
                })?;
        }

        let temp = self.temp_path();
        let write_err = |e: std::io::Error| RatingError::Storage {
            message: format!("Failed to write {}: {}", temp.display(), e),
        };
        let mut file = tokio::fs::File::create(&temp).await.map_err(write_err)?;
        file.write_all(&bytes).await.map_err(write_err)?;
        // Contents must reach the disk before the rename publishes them
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| RatingError::Storage {
                message: format!(
                    "Failed to move {} over {}: {}",
                    temp.display(),
                    self.path.display(),
                    e
                ),
            })?;

        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for JsonFileSnapshotRepository {
    async fn commit_batch(&self, batch: &[RatingSnapshot]) -> Result<()> {
        let mut snapshots = self.snapshots.lock().await;

        let mut merged = snapshots.clone();
        for snapshot in batch {
            merged.insert(snapshot.match_id, snapshot.clone());
        }

        // Only publish the merged table in memory once it is on disk
        self.write_table(&merged).await?;
        *snapshots = merged;

        debug!(
            "Committed {} snapshots to {} ({} total)",
            batch.len(),
            self.path.display(),
            snapshots.len()
        );
        Ok(())
    }

    async fn get(&self, match_id: MatchId) -> Result<Option<RatingSnapshot>> {
        Ok(self.snapshots.lock().await.get(&match_id).cloned())
    }

    async fn all_snapshots(&self) -> Result<Vec<RatingSnapshot>> {
        let mut all: Vec<RatingSnapshot> = self.snapshots.lock().await.values().cloned().collect();
        sort_snapshots(&mut all);
        Ok(all)
    }

    async fn rated_match_ids(&self) -> Result<HashSet<MatchId>> {
        Ok(self.snapshots.lock().await.keys().copied().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.snapshots.lock().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchClassification, MatchOutcome};
    use chrono::NaiveDate;

    fn snapshot(match_id: MatchId) -> RatingSnapshot {
        RatingSnapshot {
            match_id,
            date: NaiveDate::from_ymd_opt(2023, 11, 19).unwrap(),
            team_a: "India".to_string(),
            team_b: "Australia".to_string(),
            classification: MatchClassification::International,
            outcome: MatchOutcome::TeamBWon,
            rating_a: 1720,
            rating_b: 1705,
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileSnapshotRepository::open(dir.path().join("snapshots.json"))
            .await
            .unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("snapshots.json");

        {
            let repo = JsonFileSnapshotRepository::open(&path).await.unwrap();
            repo.commit_batch(&[snapshot(1), snapshot(2)]).await.unwrap();
        }

        let reopened = JsonFileSnapshotRepository::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 2);
        assert_eq!(reopened.get(2).await.unwrap(), Some(snapshot(2)));
        assert!(!reopened.temp_path().exists());
    }

    #[tokio::test]
    async fn test_each_commit_leaves_complete_table_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.json");
        let repo = JsonFileSnapshotRepository::open(&path).await.unwrap();

        repo.commit_batch(&[snapshot(1)]).await.unwrap();
        repo.commit_batch(&[snapshot(3), snapshot(2)]).await.unwrap();

        let on_disk: Vec<RatingSnapshot> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let ids: Vec<MatchId> = on_disk.iter().map(|s| s.match_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!repo.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_table_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileSnapshotRepository::open(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::Storage { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.json");
        let repo = JsonFileSnapshotRepository::open(&path).await.unwrap();
        repo.commit_batch(&[snapshot(1)]).await.unwrap();

        // A directory where the temp file should go makes the write fail
        std::fs::create_dir(repo.temp_path()).unwrap();
        assert!(repo.commit_batch(&[snapshot(2)]).await.is_err());

        assert_eq!(repo.count().await.unwrap(), 1);
        let reopened = JsonFileSnapshotRepository::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
