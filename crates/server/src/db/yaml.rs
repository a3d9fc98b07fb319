//! Read-only repository over a YAML seed document.

use std::path::Path;

use async_trait::async_trait;

use satchel_core::{Email, Employee, EmployeeId, Reflection, ReflectionId};

use super::memory::MemoryEmployeeRepository;
use super::{EmployeeRepository, ProfileField, RepositoryError, seed};

const BUNDLED_SEED: &str = include_str!("../../seed/employees.yaml");
const READ_ONLY: &str = "yaml seed repository";

/// Demo roster loaded once from a seed document.
///
/// Reads behave like any other backend; every mutation fails with
/// [`RepositoryError::ReadOnly`].
#[derive(Debug)]
pub struct YamlEmployeeRepository {
    inner: MemoryEmployeeRepository,
}

impl YamlEmployeeRepository {
    /// Load from a seed document.
    ///
    /// # Errors
    ///
    /// Returns `Seed` if the document is malformed, or `Conflict` if two
    /// records share an email.
    pub fn parse(document: &str) -> Result<Self, RepositoryError> {
        let employees = seed::parse(document)?;
        tracing::info!(count = employees.len(), "loaded yaml roster");
        Ok(Self {
            inner: MemoryEmployeeRepository::with_employees(employees)?,
        })
    }

    /// Load from a seed file on disk.
    ///
    /// # Errors
    ///
    /// Returns `Seed` if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, RepositoryError> {
        let document = std::fs::read_to_string(path)
            .map_err(|e| RepositoryError::Seed(format!("{}: {e}", path.display())))?;
        Self::parse(&document)
    }

    /// Load the roster bundled with the binary.
    ///
    /// # Errors
    ///
    /// Returns `Seed` if the bundled document is malformed.
    pub fn bundled() -> Result<Self, RepositoryError> {
        Self::parse(BUNDLED_SEED)
    }
}

#[async_trait]
impl EmployeeRepository for YamlEmployeeRepository {
    async fn get_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        self.inner.get_employees().await
    }

    async fn get_employee_by_email(&self, email: &Email) -> Result<Employee, RepositoryError> {
        self.inner.get_employee_by_email(email).await
    }

    async fn save_employee(&self, _employee: &Employee) -> Result<Employee, RepositoryError> {
        Err(RepositoryError::ReadOnly(READ_ONLY))
    }

    async fn update_profile(
        &self,
        _email: &Email,
        _field: ProfileField<'_>,
    ) -> Result<Employee, RepositoryError> {
        Err(RepositoryError::ReadOnly(READ_ONLY))
    }

    async fn delete_employee(&self, _email: &Email) -> Result<(), RepositoryError> {
        Err(RepositoryError::ReadOnly(READ_ONLY))
    }

    async fn delete_reflection(&self, _id: ReflectionId) -> Result<(), RepositoryError> {
        Err(RepositoryError::ReadOnly(READ_ONLY))
    }

    async fn append_reflection(
        &self,
        _employee_id: EmployeeId,
        _key: &str,
        _value: &str,
    ) -> Result<Reflection, RepositoryError> {
        Err(RepositoryError::ReadOnly(READ_ONLY))
    }
}
