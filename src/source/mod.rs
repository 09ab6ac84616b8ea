//! Read access to the historical match log
//!
//! The match log is owned by external storage. The engine only needs ordered
//! reads, either of all history or of everything from a given date onwards.

pub mod csv_file;
pub mod memory;

pub use csv_file::CsvMatchSource;
pub use memory::InMemoryMatchSource;

use crate::error::Result;
use crate::types::MatchRecord;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Ordered access to match records
///
/// Implementations return records sorted by `(date, id)`.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Every record, undated ones included (they sort first)
    async fn all_matches(&self) -> Result<Vec<MatchRecord>>;

    /// Dated records with `date >= from`
    async fn matches_from(&self, from: NaiveDate) -> Result<Vec<MatchRecord>>;
}

/// Sort records into processing order
pub fn sort_records(records: &mut [MatchRecord]) {
    records.sort_by_key(|record| record.sort_key());
}
