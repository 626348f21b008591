//! Charsheet Functions library.
//!
//! Serverless-style CRUD endpoints over the character store, packaged as a
//! library so the router can be tested in-process and embedded by other
//! crates.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with tracing and request-ID layers.
///
/// Sentry layers are added by the binary so embedders can opt out.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
