//! Durable snapshot storage and batched writes
//!
//! The snapshot table is the only durable state of the engine. Repositories
//! commit whole batches atomically; the gateway buffers snapshots into bounded
//! batches and owns the retry-then-halt policy.

pub mod file;
pub mod gateway;
pub mod lock;
pub mod repository;

pub use file::JsonFileSnapshotRepository;
pub use gateway::{BatchGateway, GatewayConfig};
pub use lock::RunLock;
pub use repository::{InMemorySnapshotRepository, SnapshotRepository};
