//! Configuration management for the rating engine
//!
//! This module handles all configuration loading from files and environment
//! variables, validation, and default values, plus the versioned team tables
//! (aliases and rankings) consumed by the identity resolver and the store.

pub mod app;
pub mod rating;
pub mod tables;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, EngineSettings, ServiceSettings, StorageSettings};
pub use rating::RatingConfig;
pub use tables::TeamTables;
