use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
    last_used: Instant,
    hits: u64,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Shared in-process cache with a TTL per entry and LRU eviction past `max_size`
#[derive(Clone)]
pub struct CacheManager<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    entries: Arc<RwLock<HashMap<K, Entry<V>>>>,
    ttl: Duration,
    max_size: usize,
}

impl<K, V> CacheManager<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn with_ttl_and_max_size(ttl: Duration, max_size: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            max_size: max_size.max(1),
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_size && !entries.contains_key(&key) {
            // Expired entries go first, then the least recently used one
            entries.retain(|_, entry| !entry.is_expired(now));
            if entries.len() >= self.max_size {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                    tracing::debug!("Evicted least recently used cache entry");
                }
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
                last_used: now,
                hits: 0,
            },
        );
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let expired = match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.last_used = now;
                entry.hits += 1;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
        }
        None
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().await.remove(key).map(|entry| entry.value)
    }

    /// Removes every entry whose key matches; returns how many went
    pub async fn remove_where<F>(&self, matches: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !matches(key));
        before - entries.len()
    }

    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired(now));

        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("Cleaned up {} expired cache entries", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn get_stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let expired = entries.values().filter(|e| e.is_expired(now)).count();

        CacheStats {
            total_items: entries.len(),
            active_items: entries.len() - expired,
            total_hits: entries.values().map(|e| e.hits).sum(),
            max_size: self.max_size,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_items: usize,
    pub active_items: usize,
    pub total_hits: u64,
    pub max_size: usize,
    pub ttl_seconds: u64,
}
