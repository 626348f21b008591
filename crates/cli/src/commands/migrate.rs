//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! charsheet migrate
//! ```
//!
//! # Environment Variables
//!
//! - `FUNCTIONS_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/functions/migrations/`.

use charsheet_functions::config::FunctionsConfig;
use charsheet_functions::db;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] charsheet_functions::config::ConfigError),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply pending character store migrations.
///
/// # Errors
///
/// Returns an error if no database is configured, the connection fails, or a
/// migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    let config = FunctionsConfig::from_env()?;
    let database_url = config
        .database_url
        .as_ref()
        .ok_or(MigrationError::MissingEnvVar("FUNCTIONS_DATABASE_URL"))?;

    tracing::info!("Connecting to character database...");
    let pool = db::create_pool(database_url).await?;

    tracing::info!("Running character migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Character migrations complete!");
    Ok(())
}
