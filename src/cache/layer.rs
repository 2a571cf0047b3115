//! Typed cache-aside and invalidation over an injected [`CacheStore`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::keys::{
    EVENT_LIST_NAMESPACE, EVENT_RANKING_NAMESPACE, HIGHLIGHTS_NAMESPACE, event_ranking_key,
};
use super::{CacheStats, CacheStore, MemoryCacheStore};
use crate::domain::EventId;

/// Cache facade shared by the read service and the ranking job.
///
/// Cloning is cheap; clones share the same backend. No method returns a
/// cache error: a broken backend behaves like an always-empty cache.
///
/// Every invalidation bumps a shared generation. A cache-aside fill whose
/// compute overlapped an invalidation never leaves its value in the cache.
#[derive(Debug, Clone)]
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    generation: Arc<AtomicU64>,
}

impl CacheLayer {
    /// Wraps an existing backend.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a layer over a fresh [`MemoryCacheStore`].
    #[must_use]
    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new(max_entries)))
    }

    /// Returns the decoded value cached under `key`, or `None` on a miss,
    /// a backend failure, or an undecodable entry (which is dropped).
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed; treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "undecodable cache entry; dropping");
                self.delete(key).await;
                None
            }
        }
    }

    /// Encodes and stores `value` under `key` for `ttl`. Returns whether the
    /// write succeeded; failures are logged and otherwise ignored.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache value not serializable; skipping write");
                return false;
            }
        };
        match self.store.set(key, raw, ttl).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache write failed");
                false
            }
        }
    }

    /// Returns the cached value for `key`, or runs `compute`, caches its
    /// result for `ttl` and returns it.
    ///
    /// The computed value is returned even when caching it fails, and is
    /// not cached when an invalidation ran while it was being computed.
    ///
    /// # Errors
    ///
    /// Returns the error of `compute`; nothing is cached in that case.
    pub async fn cache_aside<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            tracing::trace!(key, "cache hit");
            return Ok(cached);
        }
        tracing::trace!(key, "cache miss");
        let generation = self.generation.load(Ordering::SeqCst);
        let value = compute().await?;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(key, "invalidated during compute; not caching");
            return Ok(value);
        }
        let stored = self.set(key, &value, ttl).await;
        if stored && self.generation.load(Ordering::SeqCst) != generation {
            self.delete(key).await;
        }
        Ok(value)
    }

    /// Removes `key`. Returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache delete failed");
                false
            }
        }
    }

    /// Removes every key starting with `prefix` and returns how many were
    /// removed (0 when the backend fails).
    pub async fn invalidate_pattern(&self, prefix: &str) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match self.store.invalidate_pattern(prefix).await {
            Ok(removed) => {
                tracing::debug!(prefix, removed, "cache prefix invalidated");
                removed
            }
            Err(err) => {
                tracing::warn!(prefix, error = %err, "cache invalidation failed");
                0
            }
        }
    }

    /// Drops everything a change to `event_id` can make stale: its ranking
    /// entry, every event list and every highlight list.
    /// Call after the write is committed.
    pub async fn invalidate_event(&self, event_id: EventId) -> usize {
        let mut removed = 0;
        removed += usize::from(self.delete(&event_ranking_key(event_id)).await);
        removed += self.invalidate_pattern(EVENT_LIST_NAMESPACE).await;
        removed += self.invalidate_pattern(HIGHLIGHTS_NAMESPACE).await;
        tracing::debug!(%event_id, removed, "event cache invalidated");
        removed
    }

    /// Drops every entry derived from the ranking table.
    pub async fn invalidate_rankings(&self) -> usize {
        self.invalidate_pattern(HIGHLIGHTS_NAMESPACE).await
            + self.invalidate_pattern(EVENT_RANKING_NAMESPACE).await
            + self.invalidate_pattern(EVENT_LIST_NAMESPACE).await
    }

    /// Returns backend counters.
    pub async fn stats(&self) -> CacheStats {
        self.store.stats().await
    }
}
