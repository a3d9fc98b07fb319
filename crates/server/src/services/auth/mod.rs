//! Sign-in services.
//!
//! Delegates identity to an OAuth provider, then applies the directory's own
//! policy: a domain allow-list decides who may sign in, and first sign-in
//! provisions a profile.

mod error;
mod google;
mod provider;

pub use error::AuthError;
pub use google::GoogleProvider;
pub use provider::{IdentityProvider, ProviderIdentity, ProviderRegistry};

use rand::Rng;

use satchel_core::{Email, Employee};

use crate::db::{Directory, RepositoryError};

/// Length of the CSRF `state` parameter.
pub const STATE_LENGTH: usize = 32;

/// Email domains permitted to sign in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedDomains {
    domains: Vec<String>,
}

impl Default for AllowedDomains {
    fn default() -> Self {
        Self::new(["objectcomputing.com"])
    }
}

impl AllowedDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `email` may sign in.
    ///
    /// The address must split on `@` into exactly two parts with a non-empty
    /// local part, and the domain must equal one of the configured domains
    /// exactly. Subdomains and case variants are rejected.
    #[must_use]
    pub fn is_allowed(&self, email: &str) -> bool {
        let mut parts = email.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        !local.is_empty() && self.domains.iter().any(|allowed| allowed == domain)
    }
}

/// Generate a random alphanumeric string for OAuth `state`.
#[must_use]
pub fn generate_state(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&b| char::from(b))
        .collect()
}

/// Make sure the signed-in person has a profile.
///
/// Existing profiles are left untouched. A new profile gets the provider's
/// name and avatar plus `starter_reflections`.
///
/// # Errors
///
/// Returns `AuthError::Provider` if the address is not a valid email, or
/// `AuthError::Repository` if storage fails.
pub async fn provision_employee(
    directory: &Directory,
    identity: &ProviderIdentity,
    starter_reflections: &[(String, String)],
) -> Result<Employee, AuthError> {
    let email = Email::parse(&identity.email)
        .map_err(|e| AuthError::Provider(format!("{}: {e}", identity.email)))?;

    match directory.get_employee_by_email(&email).await {
        Ok(existing) => return Ok(existing),
        Err(RepositoryError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    tracing::info!(email = %email, "profile not found, provisioning");
    let mut employee = Employee::new(&identity.name, email.clone());
    employee.image_name = identity.avatar_url.clone().unwrap_or_default();
    for (key, value) in starter_reflections {
        employee.add_reflection(key, value);
    }

    match directory.save_employee(&employee).await {
        Ok(saved) => Ok(saved),
        // A concurrent first sign-in won the insert.
        Err(RepositoryError::Conflict(_)) => Ok(directory.get_employee_by_email(&email).await?),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::{MemoryEmployeeRepository, YamlEmployeeRepository};

    #[test]
    fn test_is_allowed() {
        let allowed = AllowedDomains::default();

        assert!(allowed.is_allowed("someone@objectcomputing.com"));
        assert!(!allowed.is_allowed("someone@someotherdomain.com"));
        assert!(!allowed.is_allowed(""));
        assert!(!allowed.is_allowed("@objectcomputing.com"));
        assert!(!allowed.is_allowed("a@b@objectcomputing.com"));
        assert!(!allowed.is_allowed("x@OBJECTCOMPUTING.com"));
        assert!(!allowed.is_allowed("x@sub.objectcomputing.com"));
        assert!(!allowed.is_allowed("objectcomputing.com"));
    }

    #[test]
    fn test_is_allowed_multiple_domains() {
        let allowed = AllowedDomains::new(["objectcomputing.com", "unityfoundation.io"]);
        assert!(allowed.is_allowed("a@unityfoundation.io"));
        assert!(allowed.is_allowed("a@objectcomputing.com"));
        assert!(!allowed.is_allowed("a@example.com"));
    }

    #[test]
    fn test_generate_state() {
        let state = generate_state(STATE_LENGTH);
        assert_eq!(state.len(), STATE_LENGTH);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(state, generate_state(STATE_LENGTH));
    }

    fn identity(email: &str) -> ProviderIdentity {
        ProviderIdentity {
            name: "Pat Doe".to_owned(),
            email: email.to_owned(),
            avatar_url: Some("https://avatars.test/pat.png".to_owned()),
        }
    }

    #[tokio::test]
    async fn test_provision_creates_profile_once() {
        let directory = Directory::new(Arc::new(MemoryEmployeeRepository::new()));
        let starter = vec![("Favorite Tool".to_owned(), "vim".to_owned())];

        let created = provision_employee(&directory, &identity("pat@objectcomputing.com"), &starter)
            .await
            .unwrap();
        assert_eq!(created.name, "Pat Doe");
        assert_eq!(created.image_name, "https://avatars.test/pat.png");
        assert_eq!(created.reflections.len(), 1);

        // Second sign-in leaves the profile alone.
        directory
            .save_position(&created.email, "Engineer")
            .await
            .unwrap();
        let again = provision_employee(&directory, &identity("pat@objectcomputing.com"), &starter)
            .await
            .unwrap();
        assert_eq!(again.position, "Engineer");
        assert_eq!(again.reflections.len(), 1);
        assert_eq!(directory.get_employees().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provision_without_starter_reflections() {
        let directory = Directory::new(Arc::new(MemoryEmployeeRepository::new()));
        let created = provision_employee(&directory, &identity("pat@objectcomputing.com"), &[])
            .await
            .unwrap();
        assert!(created.reflections.is_empty());
    }

    #[tokio::test]
    async fn test_provision_storage_failure() {
        let directory = Directory::new(Arc::new(YamlEmployeeRepository::bundled().unwrap()));
        let err = provision_employee(&directory, &identity("pat@objectcomputing.com"), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Repository(RepositoryError::ReadOnly(_))
        ));
    }
}
