//! Name → field bookkeeping for one aggregate.
//!
//! The registry owns its entries and the dependency graph between them.
//! Entries keep registration order. Dependencies are recorded both ways:
//! `reads[reader]` holds the names a reader consulted while validating, and
//! `dependents[target]` holds the readers to re-validate when `target`
//! changes. Both ends of an edge are registered names. A read of a name
//! with no entry waits in `awaiting` and becomes an edge when that name
//! registers; readers of a removed name go back to waiting on it.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{FormError, Result};

/// Entries plus the dependency graph between them.
#[derive(Debug, Clone)]
pub struct Registry<H> {
    entries: Vec<(String, H)>,
    reads: BTreeMap<String, BTreeSet<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
    /// Readers of names that have no entry, keyed by the missing name.
    awaiting: BTreeMap<String, BTreeSet<String>>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            reads: BTreeMap::new(),
            dependents: BTreeMap::new(),
            awaiting: BTreeMap::new(),
        }
    }
}

impl<H: Clone> Registry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::DuplicateRegistration`] when the name is taken.
    pub fn insert(&mut self, name: &str, handle: H) -> Result<()> {
        if self.contains(name) {
            return Err(FormError::DuplicateRegistration {
                name: name.to_string(),
            });
        }
        self.entries.push((name.to_string(), handle));
        if let Some(readers) = self.awaiting.remove(name) {
            for reader in readers {
                self.link(&reader, name);
            }
        }
        Ok(())
    }

    /// Remove an entry and every dependency edge that mentions it.
    pub fn remove(&mut self, name: &str) -> Option<H> {
        let index = self.entries.iter().position(|(entry, _)| entry == name)?;
        let (_, handle) = self.entries.remove(index);
        self.prune(name);
        Some(handle)
    }

    pub fn get(&self, name: &str) -> Option<&H> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, handle)| handle)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Handles in registration order.
    pub fn handles(&self) -> Vec<H> {
        self.entries.iter().map(|(_, handle)| handle.clone()).collect()
    }

    /// Record that `reader` consulted `target`.
    ///
    /// Self-reads and reads by unregistered readers are ignored. A target
    /// without an entry is remembered until it registers.
    pub fn record_read(&mut self, reader: &str, target: &str) {
        if reader == target || !self.contains(reader) {
            return;
        }
        if !self.contains(target) {
            self.awaiting
                .entry(target.to_string())
                .or_default()
                .insert(reader.to_string());
            return;
        }
        self.link(reader, target);
    }

    fn link(&mut self, reader: &str, target: &str) {
        let added = self
            .reads
            .entry(reader.to_string())
            .or_default()
            .insert(target.to_string());
        self.dependents
            .entry(target.to_string())
            .or_default()
            .insert(reader.to_string());
        if added {
            debug!(reader, target, "recorded field dependency");
        }
    }

    /// Readers to re-validate when `target` changes, registered or not.
    pub fn dependents_of(&self, target: &str) -> Vec<String> {
        let linked = self.dependents.get(target).into_iter().flatten();
        let waiting = self.awaiting.get(target).into_iter().flatten();
        let readers: BTreeSet<&String> = linked.chain(waiting).collect();
        readers.into_iter().cloned().collect()
    }

    /// Names consulted by readers that have no entry yet.
    pub fn awaited(&self) -> Vec<String> {
        self.awaiting.keys().cloned().collect()
    }

    /// Names `reader` has consulted.
    pub fn reads_of(&self, reader: &str) -> Vec<String> {
        self.reads
            .get(reader)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn prune(&mut self, name: &str) {
        if let Some(targets) = self.reads.remove(name) {
            for target in targets {
                if let Some(readers) = self.dependents.get_mut(&target) {
                    readers.remove(name);
                    if readers.is_empty() {
                        self.dependents.remove(&target);
                    }
                }
            }
        }
        self.awaiting.retain(|_, readers| {
            readers.remove(name);
            !readers.is_empty()
        });
        if let Some(readers) = self.dependents.remove(name) {
            for reader in &readers {
                if let Some(targets) = self.reads.get_mut(reader) {
                    targets.remove(name);
                    if targets.is_empty() {
                        self.reads.remove(reader);
                    }
                }
            }
            self.awaiting.insert(name.to_string(), readers);
        }
    }
}
