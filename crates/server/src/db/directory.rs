//! The employee directory façade.
//!
//! [`Directory`] owns the active [`EmployeeRepository`] backend and is the only
//! way handlers and the auth flow reach storage.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::instrument;

use satchel_core::{Email, Employee, Reflection, ReflectionId};

use super::{EmployeeRepository, ProfileField, RepositoryError};

type Backend = Arc<dyn EmployeeRepository>;

/// Holder of the active repository backend.
///
/// A directory may be created without a backend; every operation then fails
/// with [`RepositoryError::Uninitialized`] until one is configured.
#[derive(Default)]
pub struct Directory {
    backend: RwLock<Option<Backend>>,
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Directory {
    /// Create a directory backed by `repo`.
    #[must_use]
    pub fn new(repo: Arc<dyn EmployeeRepository>) -> Self {
        Self {
            backend: RwLock::new(Some(repo)),
        }
    }

    /// Create a directory with no backend.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Install `repo` as the active backend.
    pub fn configure(&self, repo: Arc<dyn EmployeeRepository>) {
        *self.write() = Some(repo);
    }

    /// Swap in a substitute backend (or none) until the returned guard drops.
    ///
    /// The previous backend is restored when the guard goes out of scope,
    /// including while unwinding from a panic.
    #[must_use = "the previous backend is restored as soon as the guard is dropped"]
    pub fn replace_for_scope(&self, repo: Option<Arc<dyn EmployeeRepository>>) -> ScopedBackend<'_> {
        let previous = std::mem::replace(&mut *self.write(), repo);
        ScopedBackend {
            directory: self,
            previous: Some(previous),
        }
    }

    /// Whether a backend is installed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Backend>> {
        self.backend.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone the backend handle so no lock is held across an await.
    fn backend(&self) -> Result<Backend, RepositoryError> {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RepositoryError::Uninitialized)
    }

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `Uninitialized` or the backend's own failure.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.backend()?.ping().await
    }

    /// All employees in roster order.
    ///
    /// # Errors
    ///
    /// Returns `Uninitialized` or a storage error.
    #[instrument(skip(self))]
    pub async fn get_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.backend()?.get_employees().await
    }

    /// Look up one employee with reflections loaded.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no employee has this email.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get_employee_by_email(&self, email: &Email) -> Result<Employee, RepositoryError> {
        self.backend()?.get_employee_by_email(email).await
    }

    /// Insert or update an employee.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` on a duplicate email, or a storage error.
    #[instrument(skip(self, employee), fields(email = %employee.email))]
    pub async fn save_employee(&self, employee: &Employee) -> Result<Employee, RepositoryError> {
        self.backend()?.save_employee(employee).await
    }

    /// Delete an employee and its reflections.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no employee has this email.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn delete_employee(&self, email: &Email) -> Result<(), RepositoryError> {
        self.backend()?.delete_employee(email).await
    }

    /// Replace the position of the employee identified by `email`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no employee has this email.
    #[instrument(skip(self, position), fields(email = %email))]
    pub async fn save_position(
        &self,
        email: &Email,
        position: &str,
    ) -> Result<Employee, RepositoryError> {
        self.backend()?
            .update_profile(email, ProfileField::Position(position))
            .await
    }

    /// Replace the bio of the employee identified by `email`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no employee has this email.
    #[instrument(skip(self, bio), fields(email = %email))]
    pub async fn save_bio(&self, email: &Email, bio: &str) -> Result<Employee, RepositoryError> {
        self.backend()?
            .update_profile(email, ProfileField::Bio(bio))
            .await
    }

    /// Append a reflection to the employee identified by `email`.
    ///
    /// Duplicate keys accumulate.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no employee has this email.
    #[instrument(skip(self, value), fields(email = %email))]
    pub async fn add_reflection(
        &self,
        email: &Email,
        key: &str,
        value: &str,
    ) -> Result<Reflection, RepositoryError> {
        let backend = self.backend()?;
        let employee = backend.get_employee_by_email(email).await?;
        let employee_id = employee.id.ok_or_else(|| {
            RepositoryError::DataCorruption(format!("stored employee {email} has no id"))
        })?;
        backend.append_reflection(employee_id, key, value).await
    }

    /// Delete one of the reflections owned by the employee identified by `email`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no employee has this email, and
    /// `ReflectionNotFound` if the reflection belongs to someone else or
    /// does not exist.
    #[instrument(skip(self), fields(email = %email, reflection_id = %id))]
    pub async fn delete_reflection(
        &self,
        email: &Email,
        id: ReflectionId,
    ) -> Result<(), RepositoryError> {
        let backend = self.backend()?;
        let employee = backend.get_employee_by_email(email).await?;
        if employee.reflection(id).is_none() {
            return Err(RepositoryError::ReflectionNotFound);
        }
        backend.delete_reflection(id).await
    }
}

/// Guard returned by [`Directory::replace_for_scope`].
pub struct ScopedBackend<'a> {
    directory: &'a Directory,
    previous: Option<Option<Backend>>,
}

impl Drop for ScopedBackend<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.directory.write() = previous;
        }
    }
}
