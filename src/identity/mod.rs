//! Team identity normalization
//!
//! Collapses historical franchise renames and spelling variants onto a single
//! canonical team key.

pub mod resolver;

pub use resolver::IdentityResolver;
