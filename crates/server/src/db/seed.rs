//! YAML seed documents.
//!
//! A seed is a list of employee records:
//!
//! ```yaml
//! - name: Henry David Thoreau
//!   email: henry@thewoods.org
//!   position: Surveyor        # optional
//!   bio: Lived deliberately.  # optional
//!   image: thoreau.jpg        # optional
//!   scores:                   # optional, kept in document order
//!     Contemplative: 10
//!     Favorite Place: Walden Pond
//! ```
//!
//! Scores become reflections with their values rendered as strings.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use satchel_core::{Email, Employee};

use super::RepositoryError;

/// A score value as written in the seed document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Flag(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedRecord {
    name: String,
    email: String,
    #[serde(default)]
    position: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    scores: serde_yaml::Mapping,
}

impl SeedRecord {
    fn into_employee(self) -> Result<Employee, RepositoryError> {
        let email = Email::parse(&self.email)
            .map_err(|e| RepositoryError::Seed(format!("{}: {e}", self.email)))?;

        let mut employee = Employee::new(self.name, email);
        employee.position = self.position;
        employee.bio = self.bio;
        employee.image_name = self.image;

        for (key, value) in self.scores {
            let key = score_key(key)?;
            let value: ScoreValue = serde_yaml::from_value(value)
                .map_err(|e| RepositoryError::Seed(format!("score {key:?}: {e}")))?;
            employee.add_reflection(key, value.to_string());
        }

        Ok(employee)
    }
}

fn score_key(key: serde_yaml::Value) -> Result<String, RepositoryError> {
    let key: ScoreValue = serde_yaml::from_value(key)
        .map_err(|e| RepositoryError::Seed(format!("score key: {e}")))?;
    Ok(key.to_string())
}

/// Parse a seed document into unsaved employees.
///
/// # Errors
///
/// Returns `RepositoryError::Seed` if the document is malformed or a record
/// carries an invalid email.
pub fn parse(document: &str) -> Result<Vec<Employee>, RepositoryError> {
    let records: Vec<SeedRecord> =
        serde_yaml::from_str(document).map_err(|e| RepositoryError::Seed(e.to_string()))?;

    records.into_iter().map(SeedRecord::into_employee).collect()
}

/// Read and parse a seed document from disk.
///
/// # Errors
///
/// Returns `RepositoryError::Seed` if the file cannot be read or parsed.
pub fn load(path: &Path) -> Result<Vec<Employee>, RepositoryError> {
    let document = std::fs::read_to_string(path)
        .map_err(|e| RepositoryError::Seed(format!("{}: {e}", path.display())))?;
    parse(&document)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_keep_document_order_and_render() {
        let employees = parse(
            r"
- name: Margaret Fuller
  email: margaret@thedial.org
  scores:
    Zeal: 9.5
    Active: true
    Languages: 4
    Motto: Very well
",
        )
        .unwrap();

        let pairs: Vec<_> = employees[0]
            .reflections
            .iter()
            .map(|r| (r.key.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("Zeal", "9.5"),
                ("Active", "true"),
                ("Languages", "4"),
                ("Motto", "Very well"),
            ]
        );
    }

    #[test]
    fn test_optional_fields_default_to_empty() {
        let employees = parse("- { name: Plato, email: plato@academy.gr }").unwrap();
        let plato = &employees[0];
        assert_eq!(plato.position, "");
        assert_eq!(plato.bio, "");
        assert_eq!(plato.image_name, "");
        assert!(plato.reflections.is_empty());
        assert!(plato.id.is_none());
    }

    #[test]
    fn test_image_maps_to_image_name() {
        let employees =
            parse("- { name: Plato, email: plato@academy.gr, image: plato.png }").unwrap();
        assert_eq!(employees[0].image_name, "plato.png");
    }

    #[test]
    fn test_invalid_email_rejected() {
        let err = parse("- { name: Nobody, email: not-an-email }").unwrap_err();
        assert!(matches!(err, RepositoryError::Seed(_)));
    }

    #[test]
    fn test_missing_email_rejected() {
        assert!(parse("- { name: Nobody }").is_err());
    }

    #[test]
    fn test_bundled_seed_parses() {
        let employees = parse(include_str!("../../seed/employees.yaml")).unwrap();
        assert_eq!(employees.len(), 3);
        assert_eq!(employees[0].reflections[2].value, "Walden Pond");
    }
}
