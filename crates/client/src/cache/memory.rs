//! In-memory cache backed by `moka`.

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;

use charsheet_core::{CharacterId, cache_key};

use super::{CacheError, LocalCache, decode};

/// Process-local cache. Entries never expire.
///
/// Blobs are stored as serialized strings so corruption can be simulated
/// with [`insert_raw`](Self::insert_raw).
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, String>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    /// Store an arbitrary string under a raw key.
    pub async fn insert_raw(&self, key: impl Into<String>, raw: impl Into<String>) {
        self.entries.insert(key.into(), raw.into()).await;
    }

    /// Read the raw string stored for a character.
    pub async fn get_raw(&self, id: &CharacterId) -> Option<String> {
        self.entries.get(&cache_key(id)).await
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, id: &CharacterId) -> Result<Option<Value>, CacheError> {
        let key = cache_key(id);
        match self.entries.get(&key).await {
            Some(raw) => decode(&key, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn set(&self, id: &CharacterId, data: &Value) -> Result<(), CacheError> {
        let raw = serde_json::to_string(data)?;
        self.entries.insert(cache_key(id), raw).await;
        Ok(())
    }
}
