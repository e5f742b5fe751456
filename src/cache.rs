use crate::config::CacheConfig;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_access: Instant,
}

impl<V: Clone> CacheEntry<V> {
    fn new(value: V) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_access: now,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }

    fn access(&mut self) -> V {
        self.last_access = Instant::now();
        self.value.clone()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
}

/// Bounded, expiring memo of provider lookups.
///
/// A disabled cache stores nothing and every lookup misses.
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    max_size: usize,
    ttl: Duration,
    enabled: bool,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        tracing::info!(
            "Initializing detail cache (enabled: {}, max_size: {}, expiration: {}s)",
            config.enabled,
            config.max_size,
            config.expiration_secs
        );

        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
            max_size: config.max_size,
            ttl: Duration::from_secs(config.expiration_secs),
            enabled: config.enabled && config.max_size > 0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(&CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // A panic while holding the lock leaves plain data behind; keep using it
    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if !self.enabled {
            return None;
        }

        let mut guard = self.lock();
        let inner = &mut *guard;
        let expired = match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                let value = entry.access();
                inner.stats.hits += 1;
                tracing::debug!("Cache hit for key: {}", key);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            tracing::debug!("Cache entry expired for key: {}", key);
            inner.entries.remove(key);
        } else {
            tracing::debug!("Cache miss for key: {}", key);
        }
        inner.stats.misses += 1;
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        if !self.enabled {
            return;
        }

        let key = key.into();
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.entries.len() >= self.max_size && !inner.entries.contains_key(&key) {
            Self::evict(inner, self.ttl);
        }
        inner.entries.insert(key, CacheEntry::new(value));
        inner.stats.inserts += 1;
    }

    // Drops expired entries first; when none expired, the least recently accessed one
    fn evict(inner: &mut Inner<V>, ttl: Duration) {
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(ttl));
        let mut evicted = before - inner.entries.len();

        if evicted == 0 {
            let lru = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());
            if let Some(key) = lru {
                inner.entries.remove(&key);
                tracing::debug!("Evicted least recently used cache entry: {}", key);
                evicted = 1;
            }
        }
        inner.stats.evictions += evicted as u64;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}
