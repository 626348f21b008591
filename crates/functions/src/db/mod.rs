//! Character storage for the functions server.
//!
//! # Backends
//!
//! - [`PgCharacterRepository`] - `PostgreSQL` (`charsheet.character`, jsonb documents)
//! - [`MemoryCharacterRepository`] - process-local map for development and tests
//!
//! Both implement [`CharacterRepository`] with identical semantics; updates are
//! JSON merge patches applied atomically per record.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/functions/migrations/` and run via:
//! ```bash
//! cargo run -p charsheet-cli -- migrate
//! ```

mod characters;
mod memory;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use charsheet_core::{CharacterId, CharacterRecord, PlayerId};

pub use characters::PgCharacterRepository;
pub use memory::MemoryCharacterRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Storage operations backing the character functions.
#[async_trait]
pub trait CharacterRepository: Send + Sync {
    /// Short backend name for logs and readiness output.
    fn backend(&self) -> &'static str;

    /// Get a character by ID.
    async fn get(&self, id: &CharacterId) -> Result<Option<CharacterRecord>, RepositoryError>;

    /// Create a character with a freshly assigned ID.
    async fn create(
        &self,
        owner: Option<&PlayerId>,
        data: Value,
    ) -> Result<CharacterRecord, RepositoryError>;

    /// Apply a JSON merge patch to a character's data.
    ///
    /// Returns `Ok(None)` if the character does not exist.
    async fn merge(
        &self,
        id: &CharacterId,
        patch: &Value,
    ) -> Result<Option<CharacterRecord>, RepositoryError>;

    /// List a player's characters, newest first.
    async fn list_for_player(
        &self,
        owner: &PlayerId,
    ) -> Result<Vec<CharacterRecord>, RepositoryError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply pending migrations from `crates/functions/migrations/`.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
