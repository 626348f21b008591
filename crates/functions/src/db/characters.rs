//! `PostgreSQL` character repository.
//!
//! Queries are runtime-checked so the crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use charsheet_core::{CharacterId, CharacterRecord, PlayerId, merge_patch};

use super::{CharacterRepository, RepositoryError};

const RECORD_COLUMNS: &str = "id, owner_id, data, updated_at";

/// Repository for character documents stored in `charsheet.character`.
#[derive(Clone)]
pub struct PgCharacterRepository {
    pool: PgPool,
}

impl PgCharacterRepository {
    /// Create a new character repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Convert a row into a domain record, validating stored identifiers.
fn record_from_row(row: &PgRow) -> Result<CharacterRecord, RepositoryError> {
    let id: String = row.try_get("id")?;
    let owner_id: Option<String> = row.try_get("owner_id")?;
    let Json(data): Json<Value> = row.try_get("data")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let id = CharacterId::parse(id)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid character id: {e}")))?;
    let owner_id = owner_id
        .map(PlayerId::parse)
        .transpose()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid owner id: {e}")))?;

    Ok(CharacterRecord {
        id,
        owner_id,
        data,
        updated_at,
    })
}

#[async_trait]
impl CharacterRepository for PgCharacterRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get(&self, id: &CharacterId) -> Result<Option<CharacterRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM charsheet.character WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    #[instrument(skip(self, data))]
    async fn create(
        &self,
        owner: Option<&PlayerId>,
        data: Value,
    ) -> Result<CharacterRecord, RepositoryError> {
        let id = CharacterId::generate();

        let row = sqlx::query(&format!(
            r"
            INSERT INTO charsheet.character (id, owner_id, data)
            VALUES ($1, $2, $3)
            RETURNING {RECORD_COLUMNS}
            "
        ))
        .bind(&id)
        .bind(owner)
        .bind(Json(&data))
        .fetch_one(&self.pool)
        .await?;

        record_from_row(&row)
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    async fn merge(
        &self,
        id: &CharacterId,
        patch: &Value,
    ) -> Result<Option<CharacterRecord>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent patches apply one after another
        let row = sqlx::query("SELECT data FROM charsheet.character WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let Json(mut data): Json<Value> = row.try_get("data")?;
        merge_patch(&mut data, patch);

        let row = sqlx::query(&format!(
            r"
            UPDATE charsheet.character
            SET data = $2, updated_at = now()
            WHERE id = $1
            RETURNING {RECORD_COLUMNS}
            "
        ))
        .bind(id)
        .bind(Json(&data))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        record_from_row(&row).map(Some)
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn list_for_player(
        &self,
        owner: &PlayerId,
    ) -> Result<Vec<CharacterRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM charsheet.character
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
