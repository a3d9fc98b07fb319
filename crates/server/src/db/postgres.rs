//! `PostgreSQL` employee repository.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use satchel_core::{Email, Employee, EmployeeId, Reflection, ReflectionId};

use super::{EmployeeRepository, ProfileField, RepositoryError, map_unique_violation};

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: EmployeeId,
    name: String,
    position: String,
    email: String,
    bio: String,
    image_name: String,
}

impl EmployeeRow {
    fn into_employee(self, reflections: Vec<Reflection>) -> Result<Employee, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Employee {
            id: Some(self.id),
            name: self.name,
            position: self.position,
            email,
            bio: self.bio,
            image_name: self.image_name,
            reflections,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReflectionRow {
    id: ReflectionId,
    key: String,
    value: String,
    employee_id: EmployeeId,
}

impl From<ReflectionRow> for Reflection {
    fn from(row: ReflectionRow) -> Self {
        Self {
            id: Some(row.id),
            key: row.key,
            value: row.value,
            employee_id: Some(row.employee_id),
        }
    }
}

/// Repository over the `employees` and `reflections` tables.
#[derive(Debug, Clone)]
pub struct PgEmployeeRepository {
    pool: PgPool,
}

impl PgEmployeeRepository {
    /// Create a new repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_reflections(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Reflection>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReflectionRow>(
            r"
            SELECT id, key, value, employee_id
            FROM reflections
            WHERE employee_id = $1
            ORDER BY id
            ",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Reflection::from).collect())
    }
}

/// Write the employee row, returning its id.
async fn upsert_employee_row(
    tx: &mut Transaction<'_, Postgres>,
    employee: &Employee,
) -> Result<EmployeeId, RepositoryError> {
    let id = match employee.id {
        None => {
            sqlx::query_scalar::<_, EmployeeId>(
                r"
                INSERT INTO employees (name, position, email, bio, image_name)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                ",
            )
            .bind(&employee.name)
            .bind(&employee.position)
            .bind(&employee.email)
            .bind(&employee.bio)
            .bind(&employee.image_name)
            .fetch_one(&mut **tx)
            .await
        }
        Some(id) => {
            sqlx::query_scalar::<_, EmployeeId>(
                r"
                INSERT INTO employees (id, name, position, email, bio, image_name)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    position = EXCLUDED.position,
                    email = EXCLUDED.email,
                    bio = EXCLUDED.bio,
                    image_name = EXCLUDED.image_name
                RETURNING id
                ",
            )
            .bind(id)
            .bind(&employee.name)
            .bind(&employee.position)
            .bind(&employee.email)
            .bind(&employee.bio)
            .bind(&employee.image_name)
            .fetch_one(&mut **tx)
            .await
        }
    };

    let id = id.map_err(|e| map_unique_violation(e, "email"))?;

    // An explicit id bypasses the sequence; keep it ahead of the table.
    if employee.id.is_some() {
        sqlx::query(
            "SELECT setval(pg_get_serial_sequence('employees', 'id'), \
             GREATEST((SELECT MAX(id) FROM employees), 1))",
        )
        .execute(&mut **tx)
        .await?;
    }

    Ok(id)
}

/// Make the stored reflections of `employee_id` match `reflections`.
async fn replace_reflections(
    tx: &mut Transaction<'_, Postgres>,
    employee_id: EmployeeId,
    reflections: &[Reflection],
) -> Result<Vec<Reflection>, RepositoryError> {
    let kept: Vec<i64> = reflections
        .iter()
        .filter_map(|r| r.id.map(|id| id.as_i64()))
        .collect();

    sqlx::query("DELETE FROM reflections WHERE employee_id = $1 AND NOT (id = ANY($2))")
        .bind(employee_id)
        .bind(&kept)
        .execute(&mut **tx)
        .await?;

    let mut saved = Vec::with_capacity(reflections.len());
    for reflection in reflections {
        let updated = match reflection.id {
            Some(id) => {
                sqlx::query_as::<_, ReflectionRow>(
                    r"
                    UPDATE reflections SET key = $1, value = $2
                    WHERE id = $3 AND employee_id = $4
                    RETURNING id, key, value, employee_id
                    ",
                )
                .bind(&reflection.key)
                .bind(&reflection.value)
                .bind(id)
                .bind(employee_id)
                .fetch_optional(&mut **tx)
                .await?
            }
            None => None,
        };

        let row = match updated {
            Some(row) => row,
            None => {
                sqlx::query_as::<_, ReflectionRow>(
                    r"
                    INSERT INTO reflections (key, value, employee_id)
                    VALUES ($1, $2, $3)
                    RETURNING id, key, value, employee_id
                    ",
                )
                .bind(&reflection.key)
                .bind(&reflection.value)
                .bind(employee_id)
                .fetch_one(&mut **tx)
                .await?
            }
        };
        saved.push(row.into());
    }

    Ok(saved)
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    #[instrument(skip(self))]
    async fn get_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, name, position, email, bio, image_name FROM employees",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut employees = rows
            .into_iter()
            .map(|row| row.into_employee(Vec::new()))
            .collect::<Result<Vec<_>, _>>()?;
        employees.sort_by(Employee::roster_cmp);
        Ok(employees)
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn get_employee_by_email(&self, email: &Email) -> Result<Employee, RepositoryError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r"
            SELECT id, name, position, email, bio, image_name
            FROM employees
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let reflections = self.load_reflections(row.id).await?;
        row.into_employee(reflections)
    }

    #[instrument(skip(self, employee), fields(email = %employee.email))]
    async fn save_employee(&self, employee: &Employee) -> Result<Employee, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = upsert_employee_row(&mut tx, employee).await?;
        let reflections = replace_reflections(&mut tx, id, &employee.reflections).await?;

        tx.commit().await?;

        tracing::debug!(employee_id = %id, "employee saved");
        Ok(Employee {
            id: Some(id),
            reflections,
            ..employee.clone()
        })
    }

    #[instrument(skip(self, field), fields(email = %email))]
    async fn update_profile(
        &self,
        email: &Email,
        field: ProfileField<'_>,
    ) -> Result<Employee, RepositoryError> {
        let (sql, value) = match field {
            ProfileField::Position(position) => (
                r"
                UPDATE employees SET position = $1
                WHERE email = $2
                RETURNING id, name, position, email, bio, image_name
                ",
                position,
            ),
            ProfileField::Bio(bio) => (
                r"
                UPDATE employees SET bio = $1
                WHERE email = $2
                RETURNING id, name, position, email, bio, image_name
                ",
                bio,
            ),
        };

        let row = sqlx::query_as::<_, EmployeeRow>(sql)
            .bind(value)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let reflections = self.load_reflections(row.id).await?;
        row.into_employee(reflections)
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn delete_employee(&self, email: &Email) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, EmployeeId>(
            "SELECT id FROM employees WHERE email = $1 FOR UPDATE",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM reflections WHERE employee_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(employee_id = %id, "employee deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(reflection_id = %id))]
    async fn delete_reflection(&self, id: ReflectionId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM reflections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, value), fields(employee_id = %employee_id))]
    async fn append_reflection(
        &self,
        employee_id: EmployeeId,
        key: &str,
        value: &str,
    ) -> Result<Reflection, RepositoryError> {
        let row = sqlx::query_as::<_, ReflectionRow>(
            r"
            INSERT INTO reflections (key, value, employee_id)
            SELECT $1, $2, id FROM employees WHERE id = $3
            RETURNING id, key, value, employee_id
            ",
        )
        .bind(key)
        .bind(value)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
