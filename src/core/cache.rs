use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// A named byte-keyed collection, either in memory or on disk.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Hands out collections by name.
pub trait Store: Send + Sync {
    /// Opens (creating if needed) the collection `name`. `persist` selects the
    /// disk backend; `None` means the backend could not be opened.
    fn get_collection(&self, name: &str, persist: bool) -> Option<Arc<dyn KeyValueCollection>>;
}

struct CacheValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

/// In-process map with optional per-entry expiry.
#[derive(Clone)]
pub struct Cache<K, V> {
    inner: Arc<Mutex<HashMap<K, CacheValue<V>>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        let expired = match cache.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| at <= Instant::now()),
            None => {
                debug!("Cache MISS for key: {:?}", key);
                return None;
            }
        };
        if expired {
            debug!("Cache entry expired for key: {:?}", key);
            cache.remove(key);
            return None;
        }
        debug!("Cache HIT for key: {:?}", key);
        cache.get(key).map(|entry| entry.value.clone())
    }

    /// Inserts `value`, first dropping every entry that has already expired.
    pub async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let now = Instant::now();
        let expires_at = ttl.map(|duration| now + duration);
        let mut cache = self.inner.lock().await;
        cache.retain(|_, entry| entry.expires_at.is_none_or(|at| at > now));
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, CacheValue { value, expires_at });
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        debug!("Cache REMOVE for key: {:?}", key);
        cache.remove(key).map(|entry| entry.value)
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
