//! Entropy cache.
//!
//! Holds the most recent processed entropy value per node with an expiry.
//! The oracle only ever writes here; the cache exists for external readers
//! that want to avoid a contract round-trip.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error types for cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// TTL cannot be represented as an expiry timestamp
    #[error("Invalid TTL: {0}s")]
    InvalidTtl(u64),

    /// Backing store failure
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// A cached entropy value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct CachedEntropy {
    /// Node the value was fetched for
    pub node_id: String,
    /// Processed entropy value
    pub value: serde_json::Value,
    /// When the value was written
    pub cached_at: DateTime<Utc>,
    /// When the value stops being served
    pub expires_at: DateTime<Utc>,
}

impl CachedEntropy {
    /// Whether the entry has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Keyed entropy cache with per-entry TTL.
#[async_trait]
pub trait EntropyCache: Send + Sync {
    /// Store `value` under `node_id`, expiring `ttl_secs` from now.
    async fn put(
        &self,
        node_id: &str,
        value: serde_json::Value,
        ttl_secs: u64,
    ) -> Result<CachedEntropy, CacheError>;

    /// Read the live entry for `node_id`. Expired entries read as `None`.
    async fn get(&self, node_id: &str) -> Result<Option<CachedEntropy>, CacheError>;
}

/// Cache counters.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

/// In-process cache backed by a concurrent map.
pub struct MemoryEntropyCache {
    entries: DashMap<String, CachedEntropy>,
    writes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

impl MemoryEntropyCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            writes: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            writes: self.writes.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}

impl Default for MemoryEntropyCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Expiry timestamp `ttl_secs` after `now`.
pub fn expiry_from(now: DateTime<Utc>, ttl_secs: u64) -> Result<DateTime<Utc>, CacheError> {
    let secs = i64::try_from(ttl_secs).map_err(|_| CacheError::InvalidTtl(ttl_secs))?;
    chrono::Duration::try_seconds(secs)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(CacheError::InvalidTtl(ttl_secs))
}

#[async_trait]
impl EntropyCache for MemoryEntropyCache {
    async fn put(
        &self,
        node_id: &str,
        value: serde_json::Value,
        ttl_secs: u64,
    ) -> Result<CachedEntropy, CacheError> {
        let now = Utc::now();
        let entry = CachedEntropy {
            node_id: node_id.to_string(),
            value,
            cached_at: now,
            expires_at: expiry_from(now, ttl_secs)?,
        };

        self.entries.insert(node_id.to_string(), entry.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);

        debug!(node_id = %node_id, ttl_secs, expires_at = %entry.expires_at, "Entropy cached");
        Ok(entry)
    }

    async fn get(&self, node_id: &str) -> Result<Option<CachedEntropy>, CacheError> {
        let now = Utc::now();

        let expired = match self.entries.get(node_id) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(node_id, |_, entry| entry.is_expired_at(now));
            self.expired.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }
}
