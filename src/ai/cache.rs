//! Response Cache
//!
//! Content-addressed store for generation and critique calls. Bounded by
//! entry count (least-recently-read eviction) and by an absolute TTL that is
//! checked lazily on read. Failed computations are never stored.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::CacheConfig;
use crate::types::normalize_text;

/// Which kind of external call a cached response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Generate,
    Refine,
    Critique,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Generate => "generate",
            RequestKind::Refine => "refine",
            RequestKind::Critique => "critique",
        }
    }
}

/// SHA-256 over `kind \0 model \0 temperature \0 normalized prompt`, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(kind: RequestKind, model: &str, temperature: f32, prompt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(temperature.to_bits().to_le_bytes());
        hasher.update([0u8]);
        hasher.update(normalize_text(prompt).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// Cache hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry {
    value: String,
    created_at: Instant,
    last_read_at: Instant,
    /// Monotonic read order; instants can tie on fast clocks
    last_read_seq: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    stats: CacheStats,
    clock: u64,
}

impl CacheInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    /// Return the cached value for `key`, or run `compute` and store its success.
    ///
    /// The lock is never held across the `compute` await.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> std::result::Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<String, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = compute().await?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// Fresh value for `key`; expired entries are dropped on the way
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        // A poisoned lock degrades to a miss
        let mut inner = self.inner.lock().ok()?;
        let now = Instant::now();

        let expired = inner
            .entries
            .get(key)
            .map(|entry| now.duration_since(entry.created_at) >= self.ttl);
        let Some(expired) = expired else {
            inner.stats.misses += 1;
            return None;
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            debug!(key = &key.as_str()[..12], "Cache entry expired");
            return None;
        }

        let seq = inner.tick();
        inner.stats.hits += 1;
        let entry = inner.entries.get_mut(key)?;
        entry.last_read_at = now;
        entry.last_read_seq = seq;
        Some(entry.value.clone())
    }

    /// Store `value`, evicting the least-recently-read entry when over capacity
    pub fn insert(&self, key: CacheKey, value: String) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        let now = Instant::now();
        let seq = inner.tick();
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_read_at: now,
                last_read_seq: seq,
            },
        );

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_read_seq)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            if let Some(evicted) = inner.entries.remove(&oldest) {
                inner.stats.evictions += 1;
                debug!(
                    idle_ms = now.duration_since(evicted.last_read_at).as_millis() as u64,
                    "Evicted least recently read cache entry"
                );
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner
            .lock()
            .map(|inner| inner.stats)
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
