//! Utility functions for the rating engine

use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

/// Generate a new unique run ID
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// First date re-processed when resuming at `gap_date`
pub fn overlap_start(gap_date: NaiveDate, overlap_days: i64) -> NaiveDate {
    let days = Days::new(overlap_days.max(0) as u64);
    gap_date.checked_sub_days(days).unwrap_or(NaiveDate::MIN)
}

/// Absolute difference between two ratings
pub fn rating_difference(rating1: i64, rating2: i64) -> i64 {
    (rating1 - rating2).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_overlap_start() {
        assert_eq!(overlap_start(date(2024, 3, 1), 1), date(2024, 2, 29));
        assert_eq!(overlap_start(date(2024, 3, 1), 0), date(2024, 3, 1));
        assert_eq!(overlap_start(date(2024, 3, 1), -5), date(2024, 3, 1));
        assert_eq!(overlap_start(date(2024, 1, 10), 30), date(2023, 12, 11));
    }

    #[test]
    fn test_rating_difference() {
        assert_eq!(rating_difference(1516, 1484), 32);
        assert_eq!(rating_difference(1484, 1516), 32);
        assert_eq!(rating_difference(1500, 1500), 0);
    }
}
