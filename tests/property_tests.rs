//! Property tests for determinism, zero-sum updates and resume equivalence

mod fixtures;

use cricket_ratings::engine::RunOptions;
use cricket_ratings::persistence::{InMemorySnapshotRepository, SnapshotRepository};
use cricket_ratings::rating::EloOutcomeModel;
use cricket_ratings::source::InMemoryMatchSource;
use cricket_ratings::types::{MatchClassification, MatchOutcome, MatchRecord, RatingSnapshot};
use proptest::prelude::*;
use std::sync::Arc;

use fixtures::{coordinator, date};

const TEAMS: [&str; 8] = [
    "India",
    "Australia",
    "Ireland",
    "Nepal",
    "Hong Kong",
    "Mumbai Indians",
    "RCB-old-name",
    "RCB",
];

/// (day offset, team a, team b, winner code, international)
fn match_strategy() -> impl Strategy<Value = (u32, usize, usize, u8, bool)> {
    (0u32..60, 0usize..TEAMS.len(), 0usize..TEAMS.len(), 0u8..4, any::<bool>())
}

fn build_records(raw: &[(u32, usize, usize, u8, bool)]) -> Vec<MatchRecord> {
    raw.iter()
        .enumerate()
        .map(|(index, &(offset, a, b, winner, international))| {
            let day = date(2020, 1, 1) + chrono::Days::new(offset as u64);
            let winner = match winner {
                0 => Some(TEAMS[a]),
                1 => Some(TEAMS[b]),
                2 => Some("Somebody Else"),
                _ => None,
            };
            let classification = if international {
                MatchClassification::International
            } else {
                MatchClassification::Domestic
            };
            MatchRecord::new(
                index as u64 + 1,
                day,
                TEAMS[a],
                TEAMS[b],
                classification,
                winner,
            )
        })
        .collect()
}

async fn full_snapshots(records: Vec<MatchRecord>, batch_size: usize) -> Vec<RatingSnapshot> {
    let source = Arc::new(InMemoryMatchSource::new(records));
    let repository = Arc::new(InMemorySnapshotRepository::new());
    coordinator(source, repository.clone(), batch_size)
        .full_recompute(&RunOptions::default())
        .await
        .unwrap();
    repository.all_snapshots().await.unwrap()
}

async fn split_snapshots(records: Vec<MatchRecord>, split_offset: u32) -> Vec<RatingSnapshot> {
    let split = date(2020, 1, 1) + chrono::Days::new(split_offset as u64);
    let (early, late): (Vec<MatchRecord>, Vec<MatchRecord>) = records
        .into_iter()
        .partition(|record| record.date.is_some_and(|d| d < split));

    let source = Arc::new(InMemoryMatchSource::new(early));
    let repository = Arc::new(InMemorySnapshotRepository::new());
    let coordinator = coordinator(source.clone(), repository.clone(), 3);

    coordinator
        .run_incremental(&RunOptions::default())
        .await
        .unwrap();
    source.extend(late).unwrap();
    coordinator
        .run_incremental(&RunOptions::default())
        .await
        .unwrap();

    repository.all_snapshots().await.unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_zero_sum_deltas(
        rating_a in 800i64..2400,
        rating_b in 800i64..2400,
        outcome in prop_oneof![
            Just(MatchOutcome::TeamAWon),
            Just(MatchOutcome::TeamBWon),
            Just(MatchOutcome::NoResult),
        ],
        k in 1.0f64..64.0,
    ) {
        let model = EloOutcomeModel::with_constant_k(k);
        let (delta_a, delta_b) =
            model.compute_deltas(rating_a, rating_b, outcome, MatchClassification::International);
        prop_assert_eq!(delta_a, -delta_b);

        if rating_a == rating_b && outcome == MatchOutcome::NoResult {
            prop_assert_eq!(delta_a, 0);
        }
    }

    #[test]
    fn prop_full_replay_is_deterministic(
        raw in prop::collection::vec(match_strategy(), 1..60),
        batch_size in 1usize..16,
    ) {
        let records = build_records(&raw);
        let first = tokio_test::block_on(full_snapshots(records.clone(), batch_size));
        let second = tokio_test::block_on(full_snapshots(records, 1000));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_resume_equivalence(
        raw in prop::collection::vec(match_strategy(), 1..60),
        split_offset in 0u32..61,
    ) {
        let records = build_records(&raw);
        let full = tokio_test::block_on(full_snapshots(records.clone(), 1000));
        let split = tokio_test::block_on(split_snapshots(records, split_offset));
        prop_assert_eq!(full, split);
    }
}
