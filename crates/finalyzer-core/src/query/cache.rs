//! Process-wide intent cache
//!
//! Intent extraction is the slowest step of a query, and users tend to
//! re-ask the same question. Entries are keyed by the normalized query text,
//! expire after a TTL, and the oldest batch is evicted once the cache grows
//! past its cap.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CacheConfig;
use crate::models::Intent;

/// Time source for cache expiry
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct Entry {
    intent: Intent,
    cached_at: Instant,
    /// Insertion order, breaks ties between equal timestamps
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

/// TTL-bounded, size-capped intent cache
pub struct IntentCache {
    inner: Mutex<Inner>,
    clock: Box<dyn Clock>,
    ttl: Duration,
    max_entries: usize,
    evict_batch: usize,
}

/// Cache key for a query: SHA-256 of the lowercased, trimmed text
pub fn cache_key(query: &str) -> String {
    let normalized = query.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

impl IntentCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
            ttl: config.ttl,
            max_entries: config.max_entries,
            evict_batch: config.evict_batch,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch a fresh intent; stale entries are dropped on the way
    pub fn get(&self, query: &str) -> Option<Intent> {
        let key = cache_key(query);
        let now = self.clock.now();
        let mut inner = self.lock();

        let entry = inner.entries.get(&key)?;
        if now.saturating_duration_since(entry.cached_at) < self.ttl {
            return Some(entry.intent.clone());
        }

        inner.entries.remove(&key);
        debug!("Intent cache entry expired");
        None
    }

    /// Store an intent, evicting the oldest batch when over capacity
    pub fn put(&self, query: &str, intent: Intent) {
        let key = cache_key(query);
        let cached_at = self.clock.now();
        let mut inner = self.lock();

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            Entry {
                intent,
                cached_at,
                seq,
            },
        );

        if inner.entries.len() > self.max_entries {
            let mut by_age: Vec<(Instant, u64, String)> = inner
                .entries
                .iter()
                .map(|(k, e)| (e.cached_at, e.seq, k.clone()))
                .collect();
            by_age.sort_unstable();

            for (_, _, k) in by_age.into_iter().take(self.evict_batch) {
                inner.entries.remove(&k);
            }
            debug!(remaining = inner.entries.len(), "Evicted oldest intent cache entries");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }
}
