//! Per-key async mutexes, created on first use
//!
//! The map's shard lock is held only while an entry is looked up or
//! inserted; the per-key mutex is awaited after it is released, so a long
//! critical section on one key never blocks another key.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Process-wide registry of per-key locks. Entries are never removed.
pub struct LockRegistry<K>
where
    K: Eq + Hash,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for LockRegistry<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }
}

impl<K> LockRegistry<K>
where
    K: Eq + Hash + Clone,
{
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex for `key`, creating it if needed
    pub fn lock_for(&self, key: &K) -> Arc<Mutex<()>> {
        if let Some(existing) = self.locks.get(key) {
            return Arc::clone(existing.value());
        }
        // entry() settles racing inserts
        let entry = self.locks.entry(key.clone()).or_default();
        Arc::clone(entry.value())
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        self.lock_for(key).lock_owned().await
    }

    /// Number of keys seen so far
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no key has been locked yet
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
