//! Remote store client for the character functions.
//!
//! # Semantics
//!
//! - Every call is a single attempt; errors surface to the caller unchanged.
//! - `update_record` is a partial merge (JSON merge patch): keys absent from
//!   the payload are kept and `null` removes a key. Re-sending the same
//!   payload is safe and converges to the same record.

mod http;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use charsheet_core::{ApiError, ApiErrorKind, CharacterId, CharacterRecord, PlayerId};

pub use http::HttpRemoteStore;

/// Errors returned by remote store operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport failure (connect, timeout, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The client could not be configured.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    /// Whether this error means the record is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Classify a non-success response.
    ///
    /// 404 means the record is absent, and so does any 400 unless its body
    /// is one of our own `bad_request` or `internal` errors. Other backends
    /// report a missing record as a bare 400 with their own error shape.
    /// Everything else is a server error.
    #[must_use]
    pub fn from_response(status: u16, body: &str, resource: &str) -> Self {
        let parsed: Option<ApiError> = serde_json::from_str(body).ok();
        let known_failure = parsed.as_ref().is_some_and(|e| {
            matches!(e.kind, ApiErrorKind::BadRequest | ApiErrorKind::Internal)
        });

        if status == 404 || (status == 400 && !known_failure) {
            return Self::NotFound(resource.to_string());
        }

        let message = parsed.map_or_else(
            || body.chars().take(200).collect::<String>(),
            |e| e.error,
        );
        Self::Server { status, message }
    }
}

/// Create/read/update access to the authoritative character store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read a character.
    async fn fetch_record(&self, id: &CharacterId) -> Result<CharacterRecord, RemoteError>;

    /// Create a character and return it with its assigned ID.
    async fn create_record(
        &self,
        data: &Value,
        owner: Option<&PlayerId>,
    ) -> Result<CharacterRecord, RemoteError>;

    /// Merge-patch a character and return the authoritative result.
    async fn update_record(
        &self,
        id: &CharacterId,
        data: &Value,
    ) -> Result<CharacterRecord, RemoteError>;

    /// List a player's characters, newest first.
    async fn list_for_player(
        &self,
        player: &PlayerId,
    ) -> Result<Vec<CharacterRecord>, RemoteError>;
}
