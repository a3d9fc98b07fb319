//! Employee persistence.
//!
//! # Backends
//!
//! Every backend implements [`EmployeeRepository`]:
//!
//! - [`PgEmployeeRepository`] - `PostgreSQL` (`employees`, `reflections` tables)
//! - [`YamlEmployeeRepository`] - read-only demo roster loaded from a seed document
//! - [`MemoryEmployeeRepository`] - in-process store for development and tests
//!
//! Handlers never hold a backend directly. They go through [`Directory`],
//! which owns the active backend and layers the per-employee operations
//! (reflection membership checks) on top of it. Position and bio edits are
//! single-column updates so they never rewrite reflections.
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are embedded in
//! [`MIGRATOR`]. The server runs them at startup; they can also be run via:
//! ```bash
//! cargo run -p satchel-cli -- migrate
//! ```

pub mod directory;
pub mod memory;
pub mod postgres;
pub mod seed;
pub mod yaml;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

use satchel_core::{Email, Employee, EmployeeId, Reflection, ReflectionId};

pub use directory::{Directory, ScopedBackend};
pub use memory::MemoryEmployeeRepository;
pub use postgres::PgEmployeeRepository;
pub use yaml::YamlEmployeeRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Number of connection attempts made at startup.
pub const CONNECT_ATTEMPTS: u32 = 3;

/// Fixed delay between startup connection attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No backend has been configured for the directory.
    #[error("repository has not been initialized")]
    Uninitialized,

    /// No employee matches the lookup.
    #[error("employee not found")]
    NotFound,

    /// The reflection is not among the employee's reflections.
    #[error("reflection not found")]
    ReflectionNotFound,

    /// Constraint violation (e.g., duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The backend does not support mutation.
    #[error("{0} is read-only")]
    ReadOnly(&'static str),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Seed document could not be read or parsed.
    #[error("invalid seed data: {0}")]
    Seed(String),
}

impl RepositoryError {
    /// Whether the error means "no such record" rather than a storage failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::ReflectionNotFound)
    }
}

/// A single profile column edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField<'a> {
    Position(&'a str),
    Bio(&'a str),
}

/// Storage capability shared by all employee backends.
///
/// Implementations must keep reflections in insertion order and must never
/// let a reflection outlive its employee.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// All employees in roster order (surname, then given names).
    ///
    /// Reflections are not required to be loaded.
    async fn get_employees(&self) -> Result<Vec<Employee>, RepositoryError>;

    /// Exact-match lookup with reflections loaded.
    async fn get_employee_by_email(&self, email: &Email) -> Result<Employee, RepositoryError>;

    /// Insert (no id) or update (with id) an employee and replace its reflections.
    ///
    /// Returns the stored record with all ids assigned.
    async fn save_employee(&self, employee: &Employee) -> Result<Employee, RepositoryError>;

    /// Overwrite one profile column of the employee with `email`.
    ///
    /// Reflections are left untouched. Returns the updated record with
    /// reflections loaded.
    async fn update_profile(
        &self,
        email: &Email,
        field: ProfileField<'_>,
    ) -> Result<Employee, RepositoryError>;

    /// Delete an employee and all of its reflections.
    async fn delete_employee(&self, email: &Email) -> Result<(), RepositoryError>;

    /// Delete a reflection by id without any ownership check.
    async fn delete_reflection(&self, id: ReflectionId) -> Result<(), RepositoryError>;

    /// Append one reflection to an existing employee in a single step.
    async fn append_reflection(
        &self,
        employee_id: EmployeeId,
        key: &str,
        value: &str,
    ) -> Result<Reflection, RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(options: PgConnectOptions) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Connect with bounded retry.
///
/// Makes up to `attempts` connection attempts, sleeping `delay` between
/// them. The last error is returned once the attempts are exhausted.
///
/// # Errors
///
/// Returns the final `sqlx::Error` if no attempt succeeds.
pub async fn connect_with_retry(
    options: PgConnectOptions,
    attempts: u32,
    delay: Duration,
) -> Result<PgPool, sqlx::Error> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match create_pool(options.clone()).await {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < attempts => {
                tracing::error!(attempt, error = %e, "failed to connect to database, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempts, error = %e, "could not connect to database");
                return Err(e);
            }
        }
    }
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RepositoryError::Uninitialized.to_string(),
            "repository has not been initialized"
        );
        assert_eq!(
            RepositoryError::ReflectionNotFound.to_string(),
            "reflection not found"
        );
        assert_eq!(
            RepositoryError::ReadOnly("yaml seed").to_string(),
            "yaml seed is read-only"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(RepositoryError::NotFound.is_not_found());
        assert!(RepositoryError::ReflectionNotFound.is_not_found());
        assert!(!RepositoryError::Uninitialized.is_not_found());
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        // Port 1 on localhost refuses connections immediately.
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("nobody")
            .database("nothing");

        let started = std::time::Instant::now();
        let result = connect_with_retry(options, 2, Duration::from_millis(10)).await;
        assert!(result.is_err());
        assert!(started.elapsed() >= Duration::from_millis(10));
    }
}
