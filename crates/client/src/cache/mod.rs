//! Local cache of character blobs.
//!
//! Entries are keyed `characterData:<id>` and hold the raw character data
//! (not the full record). A blob that fails to parse is reported as
//! [`CacheError::Corrupt`] so callers can fall back to the remote copy
//! instead of silently treating it as absent.

mod file;
mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use charsheet_core::CharacterId;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Errors reading or writing the local cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The stored blob is not valid JSON.
    #[error("Corrupt cache entry {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backing storage failed.
    #[error("Cache I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The value could not be serialized.
    #[error("Failed to serialize cache value: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable key-value storage for character working copies.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Read the cached data for a character.
    async fn get(&self, id: &CharacterId) -> Result<Option<Value>, CacheError>;

    /// Overwrite the cached data for a character.
    async fn set(&self, id: &CharacterId, data: &Value) -> Result<(), CacheError>;
}

/// Parse a stored blob, classifying failures as corruption.
fn decode(key: &str, raw: &str) -> Result<Value, CacheError> {
    serde_json::from_str(raw).map_err(|source| CacheError::Corrupt {
        key: key.to_string(),
        source,
    })
}
