//! CSV match log reader
//!
//! Expected header: `id,date,team_a,team_b,classification,winner`. Dates are
//! ISO `YYYY-MM-DD`; an empty winner means tie or no result.

use super::{sort_records, MatchSource};
use crate::error::{RatingError, Result};
use crate::types::{MatchClassification, MatchId, MatchRecord};
use ::csv::StringRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Column positions taken from the header row
#[derive(Debug, Clone, Copy)]
struct LogColumns {
    width: usize,
    id: usize,
    date: Option<usize>,
    team_a: usize,
    team_b: usize,
    classification: usize,
    winner: Option<usize>,
}

impl LogColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|header| header == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| RatingError::Storage {
                message: format!("Match log header has no '{}' column", name),
            })
        };

        Ok(Self {
            width: headers.len(),
            id: required("id")?,
            date: position("date"),
            team_a: required("team_a")?,
            team_b: required("team_b")?,
            classification: required("classification")?,
            winner: position("winner"),
        })
    }

    /// Turn one row into a record
    ///
    /// Only a row without a readable id is an error. Any other problem yields
    /// a record carrying its parse error, which the processor skips and counts.
    fn parse_row(&self, row: &StringRecord) -> Result<MatchRecord> {
        let raw_id = row.get(self.id).unwrap_or_default();
        let id: MatchId = raw_id.parse().map_err(|e| RatingError::Storage {
            message: format!(
                "Match log line {} has no readable id '{}': {}",
                row.position().map_or(0, |p| p.line()),
                raw_id,
                e
            ),
        })?;

        let date = self
            .date
            .and_then(|column| row.get(column))
            .and_then(|raw| parse_date(id, raw));

        if row.len() != self.width {
            let reason = format!("expected {} fields, found {}", self.width, row.len());
            warn!("Match {} is unreadable: {}", id, reason);
            return Ok(MatchRecord::unreadable(id, date, reason));
        }

        let field = |column: usize| row.get(column).unwrap_or_default().to_string();
        let winner = self
            .winner
            .and_then(|column| row.get(column))
            .filter(|raw| !raw.is_empty())
            .map(str::to_string);

        let (classification, parse_error) =
            match field(self.classification).parse::<MatchClassification>() {
                Ok(classification) => (classification, None),
                Err(reason) => {
                    warn!("Match {} is unreadable: {}", id, reason);
                    (MatchClassification::Domestic, Some(reason))
                }
            };

        Ok(MatchRecord {
            id,
            date,
            team_a: field(self.team_a),
            team_b: field(self.team_b),
            classification,
            winner,
            parse_error,
        })
    }
}

fn parse_date(id: MatchId, raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            warn!("Match {} has unparseable date '{}': {}", id, raw, e);
            None
        }
    }
}

/// Match source reading a CSV export of the match table
#[derive(Debug, Clone)]
pub struct CsvMatchSource {
    path: PathBuf,
}

impl CsvMatchSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<MatchRecord>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RatingError::Storage {
                message: format!("Failed to read match log {}: {}", self.path.display(), e),
            })?;

        let mut records = parse_match_log(&contents)?;
        sort_records(&mut records);

        debug!(
            "Loaded {} match records from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }
}

/// Parse CSV text into match records
///
/// Unparseable dates become missing dates. Rows with the wrong number of
/// fields or an unknown classification are kept as unreadable records so the
/// run reports them. A row without a readable id, or a repeated id, fails the
/// whole log, since snapshots are keyed by match id.
pub fn parse_match_log(contents: &str) -> Result<Vec<MatchRecord>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let headers = reader.headers().map_err(|e| RatingError::Storage {
        message: format!("Unreadable match log header: {}", e),
    })?;
    let columns = LogColumns::from_headers(headers)?;

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for row in reader.records() {
        let row = row.map_err(|e| RatingError::Storage {
            message: format!("Malformed match log row: {}", e),
        })?;
        let record = columns.parse_row(&row)?;

        if !seen.insert(record.id) {
            return Err(RatingError::InvalidMatchRecord {
                match_id: record.id,
                reason: "duplicate match id".to_string(),
            }
            .into());
        }
        records.push(record);
    }

    Ok(records)
}

#[async_trait]
impl MatchSource for CsvMatchSource {
    async fn all_matches(&self) -> Result<Vec<MatchRecord>> {
        self.load().await
    }

    async fn matches_from(&self, from: NaiveDate) -> Result<Vec<MatchRecord>> {
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .filter(|record| record.date.is_some_and(|date| date >= from))
            .collect())
    }
}
