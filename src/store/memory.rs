//! In-memory registration store with fault injection.

use std::collections::{BTreeMap, HashSet};

use crate::core::errors::{Result, RrhError};
use crate::store::pattern::{RootPattern, store_path_key};
use crate::store::{RegistrationEntry, RegistrationStore};

/// Ordered in-memory store keyed by canonical entry path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, RegistrationEntry>,
    failing_roots: HashSet<String>,
    failing_deletes: HashSet<String>,
    delete_calls: usize,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a set of entries. Later duplicates replace earlier ones.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = RegistrationEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    /// Add an entry, replacing one at the same path.
    pub fn insert(&mut self, entry: RegistrationEntry) {
        self.entries.insert(store_path_key(&entry.path), entry);
    }

    /// Make every enumeration of `root_pattern` fail.
    pub fn fail_enumeration(&mut self, root_pattern: &str) {
        self.failing_roots.insert(root_pattern.to_string());
    }

    /// Make every deletion of `path` fail.
    pub fn fail_deletion(&mut self, path: &str) {
        self.failing_deletes.insert(store_path_key(path));
    }

    /// Whether an entry exists at `path`, ignoring case.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(&store_path_key(path))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `delete` calls received, successful or not.
    #[must_use]
    pub const fn delete_calls(&self) -> usize {
        self.delete_calls
    }
}

impl RegistrationStore for MemoryStore {
    fn enumerate(&self, root_pattern: &str) -> Result<Vec<RegistrationEntry>> {
        let root = RootPattern::new(root_pattern)?;
        if self.failing_roots.contains(root_pattern) {
            return Err(RrhError::RootEnumeration {
                root: root_pattern.to_string(),
                details: "injected enumeration failure".to_string(),
            });
        }
        Ok(self
            .entries
            .values()
            .filter(|entry| root.matches(&entry.path))
            .cloned()
            .collect())
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        self.delete_calls += 1;
        let key = store_path_key(path);
        if self.failing_deletes.contains(&key) {
            return Err(RrhError::EntryDeletion {
                path: path.to_string(),
                details: "injected deletion failure".to_string(),
            });
        }
        match self.entries.remove(&key) {
            Some(_) => Ok(()),
            None => Err(RrhError::EntryDeletion {
                path: path.to_string(),
                details: "entry does not exist".to_string(),
            }),
        }
    }
}
