//! Memoizing wrapper around a metadata provider

use st_core::{MetadataError, TableMetadata, TableMetadataLookup};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

type CacheKey = (String, String, String);
type CacheEntry = Result<TableMetadata, MetadataError>;

/// Caches every answer of the wrapped provider, including failures.
///
/// Entries are never invalidated; build a fresh wrapper to observe changes
/// in the underlying source. Concurrent callers may race on the first
/// lookup of a key, in which case the first stored answer wins.
#[derive(Debug)]
pub struct CachedLookup<L> {
    inner: L,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl<L: TableMetadataLookup> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped provider
    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Number of distinct keys answered so far (hits and misses).
    pub fn cached_entries(&self) -> usize {
        self.lock().len()
    }

    /// Forget every cached answer.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // A panicking reader cannot leave a half-written entry behind.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<L: TableMetadataLookup> TableMetadataLookup for CachedLookup<L> {
    fn lookup_table(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
    ) -> Result<TableMetadata, MetadataError> {
        let key = (project.to_string(), dataset.to_string(), table.to_string());
        if let Some(entry) = self.lock().get(&key) {
            return entry.clone();
        }

        // Lock released while the provider runs; it may be slow.
        let answer = self.inner.lookup_table(project, dataset, table);
        if let Err(e) = &answer {
            log::debug!("Caching metadata miss for {}.{}.{}: {}", project, dataset, table, e);
        }
        self.lock().entry(key).or_insert(answer).clone()
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
