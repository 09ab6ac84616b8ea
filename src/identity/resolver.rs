//! Alias-table backed identity resolver

use crate::config::TeamTables;
use crate::types::TeamId;
use std::collections::HashMap;

/// Maps raw team names to canonical identities
///
/// Resolution is total: a name missing from the alias table is its own
/// canonical identity. The table is fixed at construction, so the same raw
/// name resolves identically for the lifetime of the resolver and across runs
/// that load the same table version.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    aliases: HashMap<String, TeamId>,
}

impl IdentityResolver {
    /// Build a resolver from validated team tables
    pub fn new(tables: &TeamTables) -> Self {
        let aliases = tables
            .aliases
            .iter()
            .map(|(raw, canonical)| (raw.trim().to_string(), canonical.trim().to_string()))
            .collect();

        Self { aliases }
    }

    /// Canonical identity for a raw name
    pub fn resolve(&self, raw_name: &str) -> TeamId {
        let name = raw_name.trim();
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}
