//! In-memory character repository.
//!
//! Used when no database URL is configured and throughout the test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use charsheet_core::{CharacterId, CharacterRecord, PlayerId, merge_patch};

use super::{CharacterRepository, RepositoryError};

struct StoredCharacter {
    record: CharacterRecord,
    /// Insertion order, used for newest-first listings.
    seq: u64,
}

/// Process-local character store.
#[derive(Default)]
pub struct MemoryCharacterRepository {
    records: RwLock<HashMap<CharacterId, StoredCharacter>>,
    next_seq: AtomicU64,
}

impl MemoryCharacterRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under a caller-chosen ID, replacing any existing one.
    pub async fn insert(&self, record: CharacterRecord) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.records
            .write()
            .await
            .insert(record.id.clone(), StoredCharacter { record, seq });
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the repository holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CharacterRepository for MemoryCharacterRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, id: &CharacterId) -> Result<Option<CharacterRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .await
            .get(id)
            .map(|stored| stored.record.clone()))
    }

    async fn create(
        &self,
        owner: Option<&PlayerId>,
        data: Value,
    ) -> Result<CharacterRecord, RepositoryError> {
        let record = CharacterRecord {
            id: CharacterId::generate(),
            owner_id: owner.cloned(),
            data,
            updated_at: Utc::now(),
        };
        self.insert(record.clone()).await;
        Ok(record)
    }

    async fn merge(
        &self,
        id: &CharacterId,
        patch: &Value,
    ) -> Result<Option<CharacterRecord>, RepositoryError> {
        let mut records = self.records.write().await;
        let Some(stored) = records.get_mut(id) else {
            return Ok(None);
        };

        merge_patch(&mut stored.record.data, patch);
        stored.record.updated_at = Utc::now();
        Ok(Some(stored.record.clone()))
    }

    async fn list_for_player(
        &self,
        owner: &PlayerId,
    ) -> Result<Vec<CharacterRecord>, RepositoryError> {
        let records = self.records.read().await;
        let mut owned: Vec<&StoredCharacter> = records
            .values()
            .filter(|stored| stored.record.owner_id.as_ref() == Some(owner))
            .collect();
        owned.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(owned.into_iter().map(|s| s.record.clone()).collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
