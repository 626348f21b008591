//! Request and response envelopes shared by the functions server and client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::PlayerId;
use super::record::CharacterRecord;

/// Body of `POST /functions/createCharacter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCharacterRequest {
    /// Initial character document.
    pub data: Value,
    /// Player creating the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<PlayerId>,
}

/// Body of `POST /functions/updateCharacter/{id}`.
///
/// `data` is applied as a JSON merge patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCharacterRequest {
    pub data: Value,
}

/// Body of `GET /functions/getCharactersForPlayer/{playerId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterList {
    pub data: Vec<CharacterRecord>,
}

/// Error classification carried in error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    NotFound,
    BadRequest,
    Internal,
}

/// JSON error body returned by every function on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message, safe to show to users.
    pub error: String,
    /// Machine-readable classification.
    pub kind: ApiErrorKind,
}
