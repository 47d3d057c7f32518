//! Bounded keyed registry of shared connection handles.
//!
//! # Responsibilities
//! - Lock-free lookup of existing entries
//! - Serialized allocate-on-miss with a capacity ceiling
//! - Hand out shared references; entries are never replaced or evicted

use dashmap::DashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{ClientError, ClientResult};
use crate::observability::metrics;

pub const DEFAULT_MAX_SIZE: usize = 1024;

/// A keyed cache of pool handles with a fixed maximum size.
#[derive(Debug)]
pub struct PoolRegistry<K, V>
where
    K: Eq + Hash,
{
    /// Registry name used in errors, logs and metrics.
    name: &'static str,
    entries: DashMap<K, Arc<V>>,
    /// Held only across factory + insert.
    alloc_lock: Mutex<()>,
    max_size: usize,
}

impl<K, V> PoolRegistry<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(name: &'static str, max_size: usize) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            alloc_lock: Mutex::new(()),
            max_size,
        }
    }

    /// Return the entry for `key`, building it with `factory` on first use.
    ///
    /// Fails with [`ClientError::CapacityExceeded`] when the registry is full
    /// and `key` is new. Errors from `factory` are returned unchanged and
    /// leave the registry untouched.
    pub async fn get_or_create<F>(&self, key: &K, factory: F) -> ClientResult<Arc<V>>
    where
        F: FnOnce() -> ClientResult<V>,
    {
        if let Some(entry) = self.lookup(key) {
            tokio::task::yield_now().await;
            return Ok(entry);
        }

        let guard = self.alloc_lock.lock().await;

        // Another task may have allocated while we waited on the lock.
        if let Some(entry) = self.lookup(key) {
            drop(guard);
            tokio::task::yield_now().await;
            return Ok(entry);
        }

        let current = self.entries.len();
        if current >= self.max_size {
            tracing::warn!(
                registry = self.name,
                current,
                max = self.max_size,
                "Pool registry full"
            );
            return Err(ClientError::CapacityExceeded {
                registry: self.name,
                current,
                max: self.max_size,
            });
        }

        let entry = Arc::new(factory()?);
        self.entries.insert(key.clone(), Arc::clone(&entry));
        drop(guard);

        tracing::info!(registry = self.name, key = ?key, "Started new pool");
        metrics::record_pool_allocation(self.name, self.entries.len());

        tokio::task::yield_now().await;
        Ok(entry)
    }

    fn lookup(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
