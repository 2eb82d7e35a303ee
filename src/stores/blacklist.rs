use crate::models::blacklist::{BlacklistEntry, BlacklistReason};
use crate::utils::time::current_timestamp;
use crate::wal::wal::{Wal, WalOperation};
use anyhow::Result;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Durable set of disqualified content identifiers
///
/// Lookups go through a concurrent map; every mutation is serialized by the
/// `order` lock and journaled before the in-memory set changes.
pub struct BlacklistStore {
    entries: DashMap<String, BlacklistEntry>,
    order: Mutex<Vec<String>>,
    wal: Option<Arc<Wal>>,
}

impl BlacklistStore {
    pub fn new(wal: Arc<Wal>) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(Vec::new()),
            wal: Some(wal),
        }
    }

    /// Store without a journal; nothing survives the process
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(Vec::new()),
            wal: None,
        }
    }

    pub fn contains(&self, info_hash: &str) -> bool {
        self.entries.contains_key(info_hash)
    }

    /// Blacklist an identifier
    ///
    /// Returns `Ok(false)` when it was already present; the first entry's
    /// reason and timestamp are kept.
    pub fn add(&self, info_hash: &str, name: &str, reason: BlacklistReason) -> Result<bool> {
        let info_hash = info_hash.to_ascii_lowercase();
        let mut order = self.order.lock();

        if self.entries.contains_key(&info_hash) {
            return Ok(false);
        }

        let entry = BlacklistEntry {
            info_hash: info_hash.clone(),
            name: name.to_string(),
            reason,
            timestamp: current_timestamp(),
        };

        if let Some(wal) = &self.wal {
            wal.log_operation(&WalOperation::Blacklist { entry: entry.clone() })?;
        }

        self.entries.insert(info_hash.clone(), entry);
        order.push(info_hash.clone());

        info!(info_hash = %info_hash, name = %name, reason = %reason, "Added to blacklist");
        Ok(true)
    }

    /// Administrative removal; returns whether the identifier was present
    pub fn remove(&self, info_hash: &str) -> Result<bool> {
        let info_hash = info_hash.to_ascii_lowercase();
        let mut order = self.order.lock();

        if !self.entries.contains_key(&info_hash) {
            return Ok(false);
        }

        if let Some(wal) = &self.wal {
            wal.log_operation(&WalOperation::Unblacklist { info_hash: info_hash.clone() })?;
        }

        self.entries.remove(&info_hash);
        order.retain(|h| h != &info_hash);

        info!(info_hash = %info_hash, "Removed from blacklist");
        Ok(true)
    }

    /// Entries in insertion order
    pub fn all(&self) -> Vec<BlacklistEntry> {
        let order = self.order.lock();
        order
            .iter()
            .filter_map(|hash| self.entries.get(hash).map(|e| e.value().clone()))
            .collect()
    }

    /// Apply a replayed journal entry without journaling it again
    pub fn restore(&self, entry: BlacklistEntry) {
        let mut order = self.order.lock();
        if !self.entries.contains_key(&entry.info_hash) {
            order.push(entry.info_hash.clone());
            self.entries.insert(entry.info_hash.clone(), entry);
        }
    }

    /// Apply a replayed removal without journaling it again
    pub fn restore_removal(&self, info_hash: &str) {
        let mut order = self.order.lock();
        if self.entries.remove(info_hash).is_some() {
            order.retain(|h| h != info_hash);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hash(c: char) -> String {
        c.to_string().repeat(40)
    }

    #[test]
    fn test_add_and_contains() {
        let store = BlacklistStore::in_memory();

        assert!(store.add(&hash('a'), "A", BlacklistReason::Stalled).unwrap());
        assert!(store.contains(&hash('a')));
        assert!(!store.contains(&hash('b')));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_add_is_idempotent_first_write_sticks() {
        let store = BlacklistStore::in_memory();

        assert!(store.add(&hash('a'), "first", BlacklistReason::Stalled).unwrap());
        let first = store.all()[0].clone();

        assert!(!store.add(&hash('a'), "second", BlacklistReason::Failed).unwrap());

        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], first);
        assert_eq!(all[0].reason, BlacklistReason::Stalled);
        assert_eq!(all[0].name, "first");
    }

    #[test]
    fn test_add_normalizes_case() {
        let store = BlacklistStore::in_memory();

        store.add(&"AB".repeat(20), "A", BlacklistReason::Failed).unwrap();
        assert!(store.contains(&"ab".repeat(20)));
        assert!(!store.add(&"ab".repeat(20), "A", BlacklistReason::Failed).unwrap());
    }

    #[test]
    fn test_all_in_insertion_order() {
        let store = BlacklistStore::in_memory();

        for c in ['c', 'a', 'b'] {
            store.add(&hash(c), "x", BlacklistReason::Stalled).unwrap();
        }

        let hashes: Vec<String> = store.all().into_iter().map(|e| e.info_hash).collect();
        assert_eq!(hashes, vec![hash('c'), hash('a'), hash('b')]);
    }

    #[test]
    fn test_remove() {
        let store = BlacklistStore::in_memory();

        store.add(&hash('a'), "A", BlacklistReason::Stalled).unwrap();
        assert!(store.remove(&hash('a')).unwrap());
        assert!(!store.contains(&hash('a')));
        assert!(store.all().is_empty());

        // Not banned, no-op
        assert!(!store.remove(&hash('a')).unwrap());
    }

    #[test]
    fn test_mutations_are_journaled() {
        let temp_dir = TempDir::new().unwrap();
        let wal = Arc::new(Wal::new(temp_dir.path().join("test.wal")).unwrap());
        let store = BlacklistStore::new(Arc::clone(&wal));

        store.add(&hash('a'), "A", BlacklistReason::Stalled).unwrap();
        store.add(&hash('a'), "A again", BlacklistReason::Failed).unwrap();
        store.add(&hash('b'), "B", BlacklistReason::Failed).unwrap();
        store.remove(&hash('b')).unwrap();

        let operations = wal.replay().unwrap();
        assert_eq!(operations.len(), 3);

        // A fresh store rebuilt from the journal sees the same state
        let restored = BlacklistStore::in_memory();
        for op in operations {
            match op {
                WalOperation::Blacklist { entry } => restored.restore(entry),
                WalOperation::Unblacklist { info_hash } => restored.restore_removal(&info_hash),
                WalOperation::Outcome { .. } => {}
            }
        }
        assert_eq!(restored.all(), store.all());
        assert!(restored.contains(&hash('a')));
        assert!(!restored.contains(&hash('b')));
    }

    #[test]
    fn test_concurrent_adds_keep_single_entry() {
        let store = Arc::new(BlacklistStore::in_memory());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.add(&hash('z'), &format!("writer {}", i), BlacklistReason::Stalled).unwrap()
                })
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.all().len(), 1);
    }
}
