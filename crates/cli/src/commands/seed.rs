//! Seed the database from a YAML roster.
//!
//! The document format is the one the server reads in `yaml` storage mode:
//! a list of records with `name`, `email`, `position`, `bio`, `image` and an
//! ordered `scores` mapping that becomes reflections.

use std::path::Path;

use tracing::{info, warn};

use satchel::db::{EmployeeRepository, PgEmployeeRepository, RepositoryError, seed};

use super::{CliError, connect};

/// Load `file` and save every record.
///
/// Without `replace`, records whose email is already present are skipped.
///
/// # Errors
///
/// Returns an error if the document is invalid or a database operation fails.
pub async fn run(file: &Path, replace: bool) -> Result<(), CliError> {
    // Parse before connecting so a bad document fails fast.
    let employees = seed::load(file)?;
    info!(path = %file.display(), records = employees.len(), "Parsed seed document");

    let repo = PgEmployeeRepository::new(connect().await?);

    let mut saved = 0_usize;
    let mut skipped = 0_usize;
    for employee in employees {
        if replace {
            match repo.delete_employee(&employee.email).await {
                Ok(()) => info!(email = %employee.email, "Removed existing employee"),
                Err(RepositoryError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }

        match repo.save_employee(&employee).await {
            Ok(stored) => {
                saved += 1;
                info!(
                    email = %stored.email,
                    reflections = stored.reflections.len(),
                    "Saved employee"
                );
            }
            Err(RepositoryError::Conflict(_)) => {
                skipped += 1;
                warn!(email = %employee.email, "Employee already exists, skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(saved, skipped, "Seeding complete!");
    Ok(())
}
