//! Rebuilding running ratings from persisted snapshots
//!
//! A snapshot holds pre-match ratings. The rating a team carried out of a
//! match is recovered by replaying that one match through the outcome model,
//! which is exact because the update rule is deterministic.

use crate::rating::EloOutcomeModel;
use crate::types::{Rating, RatingSnapshot, TeamId};
use std::collections::HashMap;

/// Rating `team` held immediately after the match described by `snapshot`
///
/// Returns `None` when the team did not take part in the match.
pub fn reconstruct_post_match_rating(
    snapshot: &RatingSnapshot,
    team: &str,
    model: &EloOutcomeModel,
) -> Option<Rating> {
    let pre_match = snapshot.rating_for(team)?;
    let (delta_a, delta_b) = model.compute_deltas(
        snapshot.rating_a,
        snapshot.rating_b,
        snapshot.outcome,
        snapshot.classification,
    );

    let delta = if snapshot.team_a == team {
        delta_a
    } else {
        delta_b
    };
    Some(pre_match + delta)
}

/// Current rating of every team appearing in `snapshots`
///
/// Each team's most recent snapshot in `(date, id)` order wins, so the input
/// may arrive in any order.
pub fn reconstruct_ratings(
    snapshots: &[RatingSnapshot],
    model: &EloOutcomeModel,
) -> HashMap<TeamId, Rating> {
    let mut latest: HashMap<&str, &RatingSnapshot> = HashMap::new();
    for snapshot in snapshots {
        for team in [snapshot.team_a.as_str(), snapshot.team_b.as_str()] {
            let newer = latest
                .get(team)
                .map_or(true, |current| snapshot.sort_key() > current.sort_key());
            if newer {
                latest.insert(team, snapshot);
            }
        }
    }

    latest
        .into_iter()
        .filter_map(|(team, snapshot)| {
            reconstruct_post_match_rating(snapshot, team, model)
                .map(|rating| (team.to_string(), rating))
        })
        .collect()
}
