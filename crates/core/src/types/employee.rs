//! Employee and reflection domain types.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{EmployeeId, ReflectionId};

/// A key/value note attached to exactly one employee.
///
/// `id` and `employee_id` are `None` until the reflection has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: Option<ReflectionId>,
    pub key: String,
    pub value: String,
    pub employee_id: Option<EmployeeId>,
}

impl Reflection {
    /// Create an unsaved reflection.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.into(),
            employee_id: None,
        }
    }
}

/// A directory entry.
///
/// The email is the external lookup key and is unique across the directory.
/// Reflections are owned by the employee and kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Storage-assigned identifier, `None` before the first save.
    pub id: Option<EmployeeId>,
    pub name: String,
    pub position: String,
    pub email: Email,
    pub bio: String,
    /// Image reference (file name or avatar URL).
    pub image_name: String,
    pub reflections: Vec<Reflection>,
}

impl Employee {
    /// Create an unsaved employee with empty profile fields.
    #[must_use]
    pub fn new(name: impl Into<String>, email: Email) -> Self {
        Self {
            id: None,
            name: name.into(),
            position: String::new(),
            email,
            bio: String::new(),
            image_name: String::new(),
            reflections: Vec::new(),
        }
    }

    /// Append an unsaved reflection.
    ///
    /// Keys are not unique: adding the same key twice keeps both entries.
    pub fn add_reflection(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let mut reflection = Reflection::new(key, value);
        reflection.employee_id = self.id;
        self.reflections.push(reflection);
    }

    /// Find an owned reflection by id.
    #[must_use]
    pub fn reflection(&self, id: ReflectionId) -> Option<&Reflection> {
        self.reflections.iter().find(|r| r.id == Some(id))
    }

    /// Last whitespace-separated word of the display name.
    #[must_use]
    pub fn surname(&self) -> &str {
        self.name.split_whitespace().next_back().unwrap_or("")
    }

    /// Everything before the surname.
    #[must_use]
    pub fn given_names(&self) -> &str {
        let trimmed = self.name.trim();
        trimmed
            .rsplit_once(char::is_whitespace)
            .map_or("", |(given, _)| given.trim_end())
    }

    /// Roster ordering: surname, then given names, then id.
    #[must_use]
    pub fn roster_cmp(&self, other: &Self) -> Ordering {
        self.surname()
            .cmp(other.surname())
            .then_with(|| self.given_names().cmp(other.given_names()))
            .then_with(|| self.id.cmp(&other.id))
    }
}
