use crate::types::{AggregatedContent, Result};
use crate::utils::text;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Key-value store with per-entry expiry. Values are serialized strings.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The stored value if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` for `ttl_seconds`, replacing any previous entry.
    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Process-local cache store.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let entry = CacheEntry {
            value: value.to_string(),
            expires_at: expiry_from_now(ttl_seconds),
        };
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }
}

// Ten years; longer windows are clamped.
const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

pub fn expiry_from_now(ttl_seconds: u64) -> DateTime<Utc> {
    let ttl = ttl_seconds.min(MAX_TTL_SECONDS) as i64;
    Utc::now() + Duration::seconds(ttl)
}

/// Aggregated content per track on top of any [`CacheStore`].
///
/// Store failures and undecodable values are logged and treated as misses.
#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn CacheStore>,
    ttl_seconds: u64,
}

impl ContentCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    pub fn key_for(topic: &str) -> String {
        format!("trends:{}", text::slugify(topic))
    }

    pub async fn get(&self, topic: &str) -> Option<AggregatedContent> {
        let key = Self::key_for(topic);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss for {}", key);
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<AggregatedContent>(&raw) {
            Ok(content) => {
                info!("Cache hit for {}", key);
                Some(content)
            }
            Err(e) => {
                warn!("Ignoring undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn put(&self, topic: &str, content: &AggregatedContent) {
        let key = Self::key_for(topic);
        let raw = match serde_json::to_string(content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not serialize content for {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.put(&key, &raw, self.ttl_seconds).await {
            warn!("Cache write failed for {}: {}", key, e);
        } else {
            debug!("Cached {} for {}s", key, self.ttl_seconds);
        }
    }
}
