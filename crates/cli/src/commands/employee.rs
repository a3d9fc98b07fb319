//! Employee maintenance commands.

use satchel::db::{EmployeeRepository, PgEmployeeRepository};
use satchel_core::Email;

use super::{CliError, connect};

/// Log the roster in display order.
///
/// # Errors
///
/// Returns an error if the database cannot be read.
pub async fn list() -> Result<(), CliError> {
    let repo = PgEmployeeRepository::new(connect().await?);
    let employees = repo.get_employees().await?;

    for employee in &employees {
        tracing::info!(
            name = %employee.name,
            email = %employee.email,
            position = %employee.position,
        );
    }
    tracing::info!(count = employees.len(), "Roster listed");
    Ok(())
}

/// Delete the employee with `email` along with their reflections.
///
/// # Errors
///
/// Returns an error if the email is invalid, no employee has it, or the
/// database operation fails.
pub async fn delete(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email)?;

    let repo = PgEmployeeRepository::new(connect().await?);
    repo.delete_employee(&email).await?;

    tracing::info!(email = %email, "Employee deleted");
    Ok(())
}
