use std::collections::HashMap;
use std::fmt::Display;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Typed cache keys with a stable string representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Cover-art lookup keyed on case-folded title and artist
    Cover { title: String, artist: String },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Cover { title, artist } => {
                write!(f, "cover:{}|{}", title.to_lowercase(), artist.to_lowercase())
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Process-local TTL cache shared across concurrent pipelines.
///
/// Constructed once per process and passed by reference. Entries past their
/// TTL are treated as misses; a race between two concurrent misses for the
/// same key is tolerated (last writer wins, entries are idempotent within
/// their TTL).
pub struct CacheStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value, or `None` if absent or expired
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(&key.to_string())
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    /// Stores a value under `key` for the configured TTL.
    ///
    /// Expired entries are swept opportunistically on write so the map does
    /// not grow without bound between lookups of distinct keys.
    pub async fn set(&self, key: &CacheKey, value: String) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
