//! Charsheet Functions - character store HTTP endpoints.
//!
//! This binary serves the `/functions/*` endpoints on port 8888.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` jsonb documents when a database URL is configured
//! - In-memory store otherwise (local development only; data is lost on exit)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use charsheet_functions::config::FunctionsConfig;
use charsheet_functions::db::{
    self, CharacterRepository, MemoryCharacterRepository, PgCharacterRepository,
};
use charsheet_functions::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Start Sentry when a DSN is configured. The guard flushes on drop.
fn init_sentry(config: &FunctionsConfig) -> Option<sentry::ClientInitGuard> {
    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Into::into),
        sample_rate: config.sentry_sample_rate,
        attach_stacktrace: true,
        ..Default::default()
    };
    let guard = sentry::init((config.sentry_dsn.as_deref()?, options));
    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Install the fmt and Sentry tracing layers.
///
/// Errors and warnings become Sentry events; info and debug become breadcrumbs.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "charsheet_functions=info,tower_http=debug".into());

    let sentry_layer =
        sentry_tracing::layer().event_filter(|metadata: &tracing::Metadata<'_>| {
            match *metadata.level() {
                tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
                tracing::Level::INFO | tracing::Level::DEBUG => {
                    sentry_tracing::EventFilter::Breadcrumb
                }
                _ => sentry_tracing::EventFilter::Ignore,
            }
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();
}

/// Connect the configured repository backend.
async fn build_repository(config: &FunctionsConfig) -> Arc<dyn CharacterRepository> {
    match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            Arc::new(PgCharacterRepository::new(pool))
        }
        None => {
            tracing::warn!("No database URL configured, using in-memory character store");
            Arc::new(MemoryCharacterRepository::new())
        }
    }
}

#[tokio::main]
async fn main() {
    let config = FunctionsConfig::from_env().expect("Failed to load configuration");

    // Sentry must be up before the tracing layer forwards to it
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    // Schema changes are applied by `charsheet migrate`, never at startup
    let repository = build_repository(&config).await;
    let state = AppState::new(repository);

    let app = charsheet_functions::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("functions listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");

    #[cfg(unix)]
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.expect("Failed to install Ctrl+C handler");
            tracing::info!("Ctrl+C received, draining connections");
        }
        _ = terminate.recv() => tracing::info!("SIGTERM received, draining connections"),
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        tracing::info!("Ctrl+C received, draining connections");
    }
}
