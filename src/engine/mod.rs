//! Chronological rating engine
//!
//! The processor walks match records in `(date, id)` order and emits one
//! pre-match snapshot per match. The coordinator decides where a run starts,
//! rebuilds the running ratings from persisted snapshots, and drives the
//! processor over the remaining matches.

pub mod coordinator;
pub mod processor;
pub mod replay;
pub mod summary;
pub mod verify;

pub use coordinator::{ResumeCoordinator, RunOptions};
pub use processor::{
    resolve_record, ChronologicalProcessor, ProcessingReport, ProcessorState, RecordDefect,
    ResolvedMatch,
};
pub use replay::{reconstruct_post_match_rating, reconstruct_ratings};
pub use summary::{render_leaderboard, RunMode, RunSummary};
pub use verify::{SnapshotMismatch, VerificationReport};
