use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::error::MigrateError;

/// Source shared-step id to destination shared-step id table.
///
/// Populated while shared steps migrate, consulted while test cases migrate.
/// Entries are inserted exactly once and never updated or removed during a
/// run.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<i64, i64>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the destination id assigned to a source shared step.
    pub fn put(&mut self, source_id: i64, destination_id: i64) -> Result<(), MigrateError> {
        match self.entries.entry(source_id) {
            Entry::Occupied(_) => Err(MigrateError::DuplicateMapping(source_id)),
            Entry::Vacant(slot) => {
                slot.insert(destination_id);
                Ok(())
            }
        }
    }

    pub fn get(&self, source_id: i64) -> Option<i64> {
        self.entries.get(&source_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source display name to destination display name table for the
/// assigned-to field. Loaded once from config, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct UserMap {
    entries: HashMap<String, String>,
}

impl UserMap {
    pub fn from_table(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Returns the destination display name for a source assignee.
    ///
    /// Empty input stays empty, an unmapped name (or a name mapped to an
    /// empty value) passes through unchanged.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        if name.is_empty() {
            return name;
        }
        match self.entries.get(name) {
            Some(mapped) if !mapped.is_empty() => mapped,
            _ => name,
        }
    }
}
