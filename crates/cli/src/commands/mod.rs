//! CLI command implementations.

pub mod employee;
pub mod migrate;
pub mod seed;

use sqlx::PgPool;
use thiserror::Error;

use satchel::config::{ConfigError, DatabaseConfig};
use satchel::db::{CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY, RepositoryError, connect_with_retry};
use satchel_core::EmailError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Connect to the configured database, retrying like the server does.
///
/// # Errors
///
/// Returns an error if the settings are incomplete or every attempt fails.
pub async fn connect() -> Result<PgPool, CliError> {
    let config = DatabaseConfig::from_env()?;

    tracing::info!(host = %config.host, database = %config.name, "Connecting to database...");
    let pool = connect_with_retry(config.connect_options(), CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY)
        .await?;
    Ok(pool)
}
