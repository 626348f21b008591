//! Character records and the users who own them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::{CharacterId, PlayerId};

/// Prefix for local cache keys.
pub const CACHE_KEY_PREFIX: &str = "characterData:";

/// Build the local cache key for a character.
///
/// ```rust
/// # use charsheet_core::{CharacterId, cache_key};
/// let id = CharacterId::parse("abc123").unwrap();
/// assert_eq!(cache_key(&id), "characterData:abc123");
/// ```
#[must_use]
pub fn cache_key(id: &CharacterId) -> String {
    format!("{CACHE_KEY_PREFIX}{id}")
}

/// An authenticated principal as reported by the identity provider.
///
/// Absence of a user (`Option<User>::None`) means an anonymous visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity-provider-issued player ID.
    pub id: PlayerId,
}

impl User {
    /// Create a user from a player ID.
    #[must_use]
    pub const fn new(id: PlayerId) -> Self {
        Self { id }
    }
}

/// A persisted character sheet.
///
/// Serialized in the document-store shape `{"ref", "ownerId", "data", "ts"}`.
/// The `data` payload is opaque to everything except the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRecord {
    /// Store-assigned identifier.
    #[serde(rename = "ref")]
    pub id: CharacterId,
    /// Player who created the record, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<PlayerId>,
    /// Character sheet document.
    pub data: Value,
    /// Last write time.
    #[serde(rename = "ts")]
    pub updated_at: DateTime<Utc>,
}
