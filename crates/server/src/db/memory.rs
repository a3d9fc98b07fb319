//! In-process employee repository.
//!
//! Full read/write semantics behind a single mutex. Used for local
//! development (`SATCHEL_STORAGE=memory`) and by the router tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use satchel_core::{Email, Employee, EmployeeId, Reflection, ReflectionId};

use super::{EmployeeRepository, ProfileField, RepositoryError};

#[derive(Debug)]
struct Store {
    employees: Vec<Employee>,
    next_employee_id: i64,
    next_reflection_id: i64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            employees: Vec::new(),
            next_employee_id: 1,
            next_reflection_id: 1,
        }
    }
}

impl Store {
    fn position_by_email(&self, email: &Email) -> Option<usize> {
        self.employees.iter().position(|e| &e.email == email)
    }

    fn employee_id(&mut self) -> EmployeeId {
        let id = EmployeeId::new(self.next_employee_id);
        self.next_employee_id += 1;
        id
    }

    fn reflection_id(&mut self) -> ReflectionId {
        let id = ReflectionId::new(self.next_reflection_id);
        self.next_reflection_id += 1;
        id
    }

    /// Reflection ids currently owned by anyone other than `owner`.
    fn owned_elsewhere(&self, owner: EmployeeId, id: ReflectionId) -> bool {
        self.employees
            .iter()
            .filter(|e| e.id != Some(owner))
            .any(|e| e.reflection(id).is_some())
    }
}

/// Repository that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryEmployeeRepository {
    store: Mutex<Store>,
}

impl MemoryEmployeeRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with `employees`.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if two records share an email.
    pub fn with_employees(employees: Vec<Employee>) -> Result<Self, RepositoryError> {
        let repo = Self::new();
        {
            let mut store = repo.lock();
            for employee in employees {
                save(&mut store, &employee)?;
            }
        }
        Ok(repo)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn save(store: &mut Store, employee: &Employee) -> Result<Employee, RepositoryError> {
    let existing = employee
        .id
        .and_then(|id| store.employees.iter().position(|e| e.id == Some(id)));

    let duplicate = store
        .employees
        .iter()
        .enumerate()
        .any(|(i, e)| e.email == employee.email && Some(i) != existing);
    if duplicate {
        return Err(RepositoryError::Conflict("email already exists".to_owned()));
    }

    let id = match employee.id {
        Some(id) => {
            store.next_employee_id = store.next_employee_id.max(id.as_i64().saturating_add(1));
            id
        }
        None => store.employee_id(),
    };

    let mut reflections = Vec::with_capacity(employee.reflections.len());
    for reflection in &employee.reflections {
        let keep_id = reflection
            .id
            .filter(|rid| !store.owned_elsewhere(id, *rid));
        let rid = match keep_id {
            Some(rid) => {
                store.next_reflection_id =
                    store.next_reflection_id.max(rid.as_i64().saturating_add(1));
                rid
            }
            None => store.reflection_id(),
        };
        reflections.push(Reflection {
            id: Some(rid),
            key: reflection.key.clone(),
            value: reflection.value.clone(),
            employee_id: Some(id),
        });
    }

    let stored = Employee {
        id: Some(id),
        reflections,
        ..employee.clone()
    };

    match existing {
        Some(index) => {
            if let Some(slot) = store.employees.get_mut(index) {
                *slot = stored.clone();
            }
        }
        None => store.employees.push(stored.clone()),
    }

    Ok(stored)
}

#[async_trait]
impl EmployeeRepository for MemoryEmployeeRepository {
    async fn get_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        let mut employees = self.lock().employees.clone();
        employees.sort_by(Employee::roster_cmp);
        Ok(employees)
    }

    async fn get_employee_by_email(&self, email: &Email) -> Result<Employee, RepositoryError> {
        self.lock()
            .employees
            .iter()
            .find(|e| &e.email == email)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_employee(&self, employee: &Employee) -> Result<Employee, RepositoryError> {
        save(&mut self.lock(), employee)
    }

    async fn update_profile(
        &self,
        email: &Email,
        field: ProfileField<'_>,
    ) -> Result<Employee, RepositoryError> {
        let mut store = self.lock();
        let employee = store
            .employees
            .iter_mut()
            .find(|e| &e.email == email)
            .ok_or(RepositoryError::NotFound)?;

        match field {
            ProfileField::Position(position) => position.clone_into(&mut employee.position),
            ProfileField::Bio(bio) => bio.clone_into(&mut employee.bio),
        }
        Ok(employee.clone())
    }

    async fn delete_employee(&self, email: &Email) -> Result<(), RepositoryError> {
        let mut store = self.lock();
        let index = store
            .position_by_email(email)
            .ok_or(RepositoryError::NotFound)?;
        store.employees.remove(index);
        Ok(())
    }

    async fn delete_reflection(&self, id: ReflectionId) -> Result<(), RepositoryError> {
        let mut store = self.lock();
        for employee in &mut store.employees {
            employee.reflections.retain(|r| r.id != Some(id));
        }
        Ok(())
    }

    async fn append_reflection(
        &self,
        employee_id: EmployeeId,
        key: &str,
        value: &str,
    ) -> Result<Reflection, RepositoryError> {
        let mut store = self.lock();
        let rid = store.reflection_id();
        let employee = store
            .employees
            .iter_mut()
            .find(|e| e.id == Some(employee_id))
            .ok_or(RepositoryError::NotFound)?;

        let reflection = Reflection {
            id: Some(rid),
            key: key.to_owned(),
            value: value.to_owned(),
            employee_id: Some(employee_id),
        };
        employee.reflections.push(reflection.clone());
        Ok(reflection)
    }
}
