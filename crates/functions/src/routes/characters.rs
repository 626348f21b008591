//! Character function handlers.
//!
//! Request bodies are parsed by hand rather than through the `Json` extractor
//! so malformed payloads get the same JSON error body as every other failure.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use serde_json::Value;
use tracing::{info, instrument};

use charsheet_core::{
    CharacterId, CharacterList, CharacterRecord, CreateCharacterRequest, PlayerId,
    character_id_from_path,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Keys allowed in a `{"data": ..., "ownerId": ...}` envelope.
const ENVELOPE_KEYS: [&str; 2] = ["data", "ownerId"];

fn parse_character_id(raw: &str) -> Result<CharacterId> {
    character_id_from_path(raw)
        .ok_or_else(|| AppError::BadRequest(format!("invalid character id: {raw:?}")))
}

/// Parse a create/update body.
///
/// Accepts the `{"data": ..., "ownerId": ...}` envelope. A body that is not an
/// envelope is taken as the character data itself.
fn parse_body(body: &Bytes) -> Result<CreateCharacterRequest> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))?;

    let is_envelope = value.as_object().is_some_and(|map| {
        map.contains_key("data") && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str()))
    });

    if is_envelope {
        serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))
    } else {
        Ok(CreateCharacterRequest {
            data: value,
            owner_id: None,
        })
    }
}

/// `GET /functions/getCharacter/{id}`
#[instrument(skip(state))]
pub async fn get_character(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<CharacterRecord>> {
    let id = parse_character_id(&raw_id)?;
    info!(id = %id, "getCharacter invoked");

    let record = state
        .repository()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("character {id}")))?;

    Ok(Json(record))
}

/// `POST /functions/createCharacter`
#[instrument(skip(state, body))]
pub async fn create_character(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CharacterRecord>> {
    let request = parse_body(&body)?;

    let record = state
        .repository()
        .create(request.owner_id.as_ref(), request.data)
        .await?;

    info!(id = %record.id, owner = ?record.owner_id, "createCharacter succeeded");
    Ok(Json(record))
}

/// `POST /functions/updateCharacter/{id}`
///
/// Applies the body's `data` as a JSON merge patch. Only objects are
/// accepted: any other patch would replace the whole sheet.
#[instrument(skip(state, body))]
pub async fn update_character(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<CharacterRecord>> {
    let id = parse_character_id(&raw_id)?;
    let request = parse_body(&body)?;
    if !request.data.is_object() {
        return Err(AppError::BadRequest("update data must be a JSON object".to_string()));
    }

    let record = state
        .repository()
        .merge(&id, &request.data)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("character {id}")))?;

    info!(id = %id, "updateCharacter succeeded");
    Ok(Json(record))
}

/// `GET /functions/getCharactersForPlayer/{player_id}`
#[instrument(skip(state))]
pub async fn characters_for_player(
    State(state): State<AppState>,
    Path(raw_player): Path<String>,
) -> Result<Json<CharacterList>> {
    let player = PlayerId::parse(raw_player.trim_end_matches('/'))
        .map_err(|e| AppError::BadRequest(format!("invalid player id: {e}")))?;

    let data = state.repository().list_for_player(&player).await?;
    Ok(Json(CharacterList { data }))
}
