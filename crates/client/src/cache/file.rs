//! File-backed cache: one JSON file per key.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use charsheet_core::{CharacterId, cache_key};

use super::{CacheError, LocalCache, decode};

/// Cache persisted under a directory, surviving restarts.
///
/// The file for a key is its percent-encoded form plus `.json`. Writes go
/// to a temporary sibling and are renamed into place, so a reader never
/// sees a half-written blob.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, id: &CharacterId) -> Result<Option<Value>, CacheError> {
        let key = cache_key(id);
        let raw = match tokio::fs::read_to_string(self.path_for(&key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { key, source }),
        };
        decode(&key, &raw).map(Some)
    }

    async fn set(&self, id: &CharacterId, data: &Value) -> Result<(), CacheError> {
        let key = cache_key(id);
        let raw = serde_json::to_vec(data)?;
        let path = self.path_for(&key);
        let tmp = path.with_extension("json.tmp");

        let io = |source| CacheError::Io {
            key: key.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(io)?;
        tokio::fs::write(&tmp, raw).await.map_err(io)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io)?;

        debug!(key = %key, path = %path.display(), "Cache entry written");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    fn id(s: &str) -> CharacterId {
        CharacterId::parse(s).unwrap()
    }

    #[test]
    fn test_file_name_is_encoded_key() {
        let cache = FileCache::new("/var/cache/charsheet");
        assert_eq!(
            cache.path_for("characterData:abc123"),
            PathBuf::from("/var/cache/charsheet/characterData%3Aabc123.json")
        );
    }

    #[tokio::test]
    async fn test_roundtrip_survives_new_instance() {
        let dir = tempdir().unwrap();
        FileCache::new(dir.path())
            .set(&id("abc123"), &json!({"name": "Zed"}))
            .await
            .unwrap();

        let reopened = FileCache::new(dir.path());
        assert_eq!(
            reopened.get(&id("abc123")).await.unwrap(),
            Some(json!({"name": "Zed"}))
        );
        assert!(reopened.get(&id("other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested/cache"));
        cache.set(&id("abc123"), &json!(1)).await.unwrap();
        assert_eq!(cache.get(&id("abc123")).await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        std::fs::write(cache.path_for("characterData:abc123"), "{\"hp\":").unwrap();

        assert!(matches!(
            cache.get(&id("abc123")).await,
            Err(CacheError::Corrupt { .. })
        ));
    }
}
