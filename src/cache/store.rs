//! Key/value cache backends.
//!
//! [`CacheStore`] is the injected seam between the read path and whatever
//! holds cached values. [`MemoryCacheStore`] is the process-local backend:
//! a `HashMap` behind a [`tokio::sync::RwLock`], with per-entry expiry
//! measured on the tokio clock.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use utoipa::ToSchema;

use super::CacheError;

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CacheStats {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Successful writes.
    pub writes: u64,
    /// Entries dropped for expiry or capacity.
    pub evictions: u64,
    /// Entries removed by explicit deletes or prefix invalidation.
    pub invalidations: u64,
    /// Entries currently held (live or not yet purged).
    pub entries: u64,
}

/// Async key/value store with mandatory TTLs and prefix invalidation.
///
/// Values are opaque serialized strings. A store is an accelerator, never a
/// source of truth: callers treat any error as a miss.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Returns the live value for `key`, or `None` on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] when the backend cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidTtl`] for a zero TTL and
    /// [`CacheError::Unavailable`] when the backend cannot be reached.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`. Returns whether an entry was present.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] when the backend cannot be reached.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Removes every key starting with `prefix` and returns how many were
    /// removed. Keys without the prefix are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] when the backend cannot be reached.
    async fn invalidate_pattern(&self, prefix: &str) -> Result<usize, CacheError>;

    /// Returns a snapshot of the store counters.
    async fn stats(&self) -> CacheStats;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local [`CacheStore`] bounded to `max_entries` entries.
///
/// When full, expired entries are purged first; if that frees nothing the
/// entry closest to expiry is evicted.
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl MemoryCacheStore {
    /// Creates an empty store holding at most `max_entries` entries
    /// (at least one).
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Drops every expired entry and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.entries.write().await;
        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        let purged = before - map.len();
        self.evictions.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// Makes room for one insert into `map`.
    fn make_room(&self, map: &mut HashMap<String, CacheEntry>, now: Instant) {
        if map.len() < self.max_entries {
            return;
        }
        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        let mut evicted = before - map.len();
        if map.len() >= self.max_entries {
            let soonest = map
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = soonest {
                map.remove(&key);
                evicted += 1;
            }
        }
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let live = {
            let map = self.entries.read().await;
            match map.get(key) {
                Some(entry) if entry.is_live(now) => Some(Some(entry.value.clone())),
                Some(_) => None,
                None => Some(None),
            }
        };
        match live {
            Some(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Some(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            None => {
                // Expired: drop it unless a writer replaced it meanwhile.
                let mut map = self.entries.write().await;
                if map.get(key).is_some_and(|entry| !entry.is_live(now)) {
                    map.remove(key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl(key.to_string()));
        }
        let now = Instant::now();
        let mut map = self.entries.write().await;
        if !map.contains_key(key) {
            self.make_room(&mut map, now);
        }
        map.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    async fn invalidate_pattern(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut map = self.entries.write().await;
        let before = map.len();
        map.retain(|key, _| !key.starts_with(prefix));
        let removed = before - map.len();
        self.invalidations.fetch_add(removed as u64, Ordering::Relaxed);
        Ok(removed)
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            entries: self.entries.read().await.len() as u64,
        }
    }
}
