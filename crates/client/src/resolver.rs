//! Working copy resolution: cache first, then remote.
//!
//! # Precedence
//!
//! 1. A cache entry, when present, is the working copy. It wins even when
//!    the remote copy differs, so unsynced local edits are never clobbered.
//! 2. Otherwise the remote record's `data`.
//! 3. Otherwise an empty object.
//!
//! `needs_creation` follows the remote alone: it is set whenever the remote
//! definitively answered "not found", even if a cached draft supplies the
//! working copy. A network or server failure leaves it unset so an outage
//! never leads to a duplicate record.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use charsheet_core::{CharacterId, CharacterRecord};

use crate::cache::{CacheError, LocalCache};
use crate::remote::{RemoteError, RemoteStore};

/// Outcome of resolving a character.
#[derive(Debug)]
pub struct Resolution {
    /// Authoritative copy, when it could be retrieved.
    pub remote: Option<CharacterRecord>,
    /// Copy the UI should edit.
    pub working: Value,
    /// The remote has no record for this ID yet.
    pub needs_creation: bool,
    /// Remote failure other than "not found".
    pub remote_error: Option<RemoteError>,
    /// Unreadable or corrupt cache entry.
    pub cache_error: Option<CacheError>,
}

impl Resolution {
    /// The remote `data`, or an empty object.
    #[must_use]
    pub fn remote_data(&self) -> Value {
        self.remote
            .as_ref()
            .map_or_else(empty_object, |record| record.data.clone())
    }

    /// Resolution for a page with no character ID.
    #[must_use]
    pub fn new_character() -> Self {
        Self {
            remote: None,
            working: empty_object(),
            needs_creation: true,
            remote_error: None,
            cache_error: None,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Picks the working copy for a character.
#[derive(Clone)]
pub struct RecordResolver {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
}

impl RecordResolver {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Arc<dyn LocalCache>) -> Self {
        Self { remote, cache }
    }

    /// Resolve the working copy for `id`. Never fails; see [`Resolution`].
    #[instrument(skip(self), fields(id = %id))]
    pub async fn resolve(&self, id: &CharacterId) -> Resolution {
        let (cached, fetched) = tokio::join!(self.cache.get(id), self.remote.fetch_record(id));

        let (cached, cache_error) = match cached {
            Ok(cached) => (cached, None),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cache entry");
                (None, Some(e))
            }
        };

        let (remote, remote_missing, remote_error) = match fetched {
            Ok(record) => (Some(record), false, None),
            Err(e) if e.is_not_found() => (None, true, None),
            Err(e) => {
                warn!(error = %e, "Remote fetch failed");
                (None, false, Some(e))
            }
        };

        let needs_creation = remote_missing;
        let working = match (cached, &remote) {
            (Some(local), _) => local,
            (None, Some(record)) => record.data.clone(),
            (None, None) => empty_object(),
        };

        debug!(
            from_remote = remote.is_some(),
            needs_creation, "Character resolved"
        );

        Resolution {
            remote,
            working,
            needs_creation,
            remote_error,
            cache_error,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Utc;
    use charsheet_core::PlayerId;
    use serde_json::json;

    use super::*;
    use crate::cache::MemoryCache;

    /// Remote store with canned answers per ID.
    #[derive(Default)]
    struct FakeRemote {
        records: HashMap<String, CharacterRecord>,
        fail: bool,
    }

    #[async_trait]
    impl RemoteStore for FakeRemote {
        async fn fetch_record(&self, id: &CharacterId) -> Result<CharacterRecord, RemoteError> {
            if self.fail {
                return Err(RemoteError::Server {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            self.records
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(id.to_string()))
        }

        async fn create_record(
            &self,
            _data: &Value,
            _owner: Option<&PlayerId>,
        ) -> Result<CharacterRecord, RemoteError> {
            unreachable!("resolver never creates")
        }

        async fn update_record(
            &self,
            _id: &CharacterId,
            _data: &Value,
        ) -> Result<CharacterRecord, RemoteError> {
            unreachable!("resolver never updates")
        }

        async fn list_for_player(
            &self,
            _player: &PlayerId,
        ) -> Result<Vec<CharacterRecord>, RemoteError> {
            Ok(Vec::new())
        }
    }

    fn id() -> CharacterId {
        CharacterId::parse("abc123").unwrap()
    }

    fn record(data: Value) -> CharacterRecord {
        CharacterRecord {
            id: id(),
            owner_id: None,
            data,
            updated_at: Utc::now(),
        }
    }

    fn resolver(remote: FakeRemote, cache: MemoryCache) -> RecordResolver {
        RecordResolver::new(Arc::new(remote), Arc::new(cache))
    }

    fn remote_with(data: Value) -> FakeRemote {
        let mut remote = FakeRemote::default();
        remote.records.insert("abc123".into(), record(data));
        remote
    }

    #[tokio::test]
    async fn test_remote_copy_used_when_cache_empty() {
        let resolution = resolver(remote_with(json!({"hp": 12})), MemoryCache::new())
            .resolve(&id())
            .await;

        assert_eq!(resolution.working, json!({"hp": 12}));
        assert_eq!(resolution.remote_data(), json!({"hp": 12}));
        assert!(!resolution.needs_creation);
    }

    #[tokio::test]
    async fn test_cache_wins_over_differing_remote() {
        let cache = MemoryCache::new();
        cache.set(&id(), &json!({"hp": 3})).await.unwrap();

        let resolution = resolver(remote_with(json!({"hp": 12})), cache)
            .resolve(&id())
            .await;

        assert_eq!(resolution.working, json!({"hp": 3}));
        assert_eq!(resolution.remote_data(), json!({"hp": 12}));
    }

    #[tokio::test]
    async fn test_nothing_anywhere_needs_creation() {
        let resolution = resolver(FakeRemote::default(), MemoryCache::new())
            .resolve(&id())
            .await;

        assert!(resolution.needs_creation);
        assert_eq!(resolution.working, json!({}));
        assert!(resolution.remote.is_none());
        assert!(resolution.remote_error.is_none());
    }

    #[tokio::test]
    async fn test_cached_draft_without_remote_needs_creation() {
        let cache = MemoryCache::new();
        cache.set(&id(), &json!({"draft": true})).await.unwrap();

        let resolution = resolver(FakeRemote::default(), cache).resolve(&id()).await;
        assert!(resolution.needs_creation);
        assert!(resolution.remote.is_none());
        assert_eq!(resolution.working, json!({"draft": true}));
        assert_eq!(resolution.remote_data(), json!({}));
    }

    #[tokio::test]
    async fn test_remote_outage_does_not_need_creation() {
        let remote = FakeRemote {
            fail: true,
            ..FakeRemote::default()
        };
        let resolution = resolver(remote, MemoryCache::new()).resolve(&id()).await;

        assert!(!resolution.needs_creation);
        assert_eq!(resolution.working, json!({}));
        assert!(matches!(
            resolution.remote_error,
            Some(RemoteError::Server { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_cache_falls_back_to_remote() {
        let cache = MemoryCache::new();
        cache.insert_raw("characterData:abc123", "{{").await;

        let resolution = resolver(remote_with(json!({"hp": 12})), cache)
            .resolve(&id())
            .await;

        assert_eq!(resolution.working, json!({"hp": 12}));
        assert!(matches!(
            resolution.cache_error,
            Some(CacheError::Corrupt { .. })
        ));
    }
}
