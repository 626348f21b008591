//! Remote store commands.
//!
//! # Environment Variables
//!
//! - `CHARSHEET_BASE_URL` - Base URL of the functions server
//! - `CHARSHEET_API_TOKEN` - Optional bearer token

use charsheet_client::config::ConfigError;
use charsheet_client::{ClientConfig, HttpRemoteStore, RemoteError, RemoteStore};
use charsheet_core::{CharacterId, IdError, PlayerId};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors from record commands.
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Invalid ID: {0}")]
    InvalidId(#[from] IdError),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

fn store() -> Result<HttpRemoteStore, RecordsError> {
    let config = ClientConfig::from_env()?;
    Ok(HttpRemoteStore::new(&config)?)
}

fn print_json(value: &impl Serialize) -> Result<(), RecordsError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}

/// Fetch and print a record.
///
/// # Errors
///
/// Returns an error if the ID is invalid or the fetch fails.
pub async fn get(id: &str) -> Result<(), RecordsError> {
    let id = CharacterId::parse(id)?;
    let record = store()?.fetch_record(&id).await?;
    print_json(&record)
}

/// Create a record and print it.
///
/// # Errors
///
/// Returns an error if the data is not JSON or the create fails.
pub async fn create(data: &str, owner: Option<&str>) -> Result<(), RecordsError> {
    let data: Value = serde_json::from_str(data)?;
    let owner = owner.map(PlayerId::parse).transpose()?;
    let record = store()?.create_record(&data, owner.as_ref()).await?;
    tracing::info!(id = %record.id, "Character created");
    print_json(&record)
}

/// Merge data into a record and print the result.
///
/// # Errors
///
/// Returns an error if the input is invalid or the update fails.
pub async fn update(id: &str, data: &str) -> Result<(), RecordsError> {
    let id = CharacterId::parse(id)?;
    let data: Value = serde_json::from_str(data)?;
    let record = store()?.update_record(&id, &data).await?;
    print_json(&record)
}

/// List a player's records.
///
/// # Errors
///
/// Returns an error if the player ID is invalid or the request fails.
pub async fn list(player: &str) -> Result<(), RecordsError> {
    let player = PlayerId::parse(player)?;
    let records = store()?.list_for_player(&player).await?;
    tracing::info!(count = records.len(), "Characters listed");
    print_json(&records)
}
