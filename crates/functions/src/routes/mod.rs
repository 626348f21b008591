//! HTTP route handlers for the functions server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                    - Liveness check
//! GET  /health/ready                              - Repository reachability
//!
//! GET  /functions/getCharacter/{id}               - Read one character
//! POST /functions/createCharacter                 - Create a character
//! POST /functions/updateCharacter/{id}            - Merge-patch a character
//! GET  /functions/getCharactersForPlayer/{player} - List a player's characters
//! ```

pub mod characters;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the character function routes.
pub fn function_routes() -> Router<AppState> {
    Router::new()
        .route("/getCharacter/{id}", get(characters::get_character))
        .route("/createCharacter", post(characters::create_character))
        .route("/updateCharacter/{id}", post(characters::update_character))
        .route(
            "/getCharactersForPlayer/{player_id}",
            get(characters::characters_for_player),
        )
}

/// Create all routes for the functions server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/functions", function_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the repository is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.repository().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, backend = state.repository().backend(), "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
