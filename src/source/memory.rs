//! In-memory match source

use super::{sort_records, MatchSource};
use crate::error::{RatingError, Result};
use crate::types::MatchRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::RwLock;

/// Match log held in memory; used by tests, benches and embedding callers
#[derive(Debug, Default)]
pub struct InMemoryMatchSource {
    matches: RwLock<Vec<MatchRecord>>,
}

impl InMemoryMatchSource {
    pub fn new(mut matches: Vec<MatchRecord>) -> Self {
        sort_records(&mut matches);
        Self {
            matches: RwLock::new(matches),
        }
    }

    /// Append newly imported matches
    pub fn extend(&self, records: impl IntoIterator<Item = MatchRecord>) -> Result<()> {
        let mut matches = self
            .matches
            .write()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire matches write lock".to_string(),
            })?;

        matches.extend(records);
        sort_records(&mut matches);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.matches.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MatchSource for InMemoryMatchSource {
    async fn all_matches(&self) -> Result<Vec<MatchRecord>> {
        let matches = self
            .matches
            .read()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire matches read lock".to_string(),
            })?;

        Ok(matches.clone())
    }

    async fn matches_from(&self, from: NaiveDate) -> Result<Vec<MatchRecord>> {
        let matches = self
            .matches
            .read()
            .map_err(|_| RatingError::InternalError {
                message: "Failed to acquire matches read lock".to_string(),
            })?;

        Ok(matches
            .iter()
            .filter(|record| record.date.is_some_and(|date| date >= from))
            .cloned()
            .collect())
    }
}
