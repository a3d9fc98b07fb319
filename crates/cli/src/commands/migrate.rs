//! Database migration command.
//!
//! Applies the migrations embedded in the `satchel` crate
//! (`crates/server/migrations/`).

use satchel::db::MIGRATOR;

use super::{CliError, connect};

/// Run pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
