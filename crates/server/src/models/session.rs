//! Session-related types.
//!
//! Types stored in the session for authentication state.

use satchel_core::{Email, Employee};

use crate::error::AppError;

/// The signed-in person, as recorded in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub email: Email,
}

impl CurrentUser {
    #[must_use]
    pub const fn new(email: Email) -> Self {
        Self { email }
    }

    /// Whether this user may change `employee`'s profile.
    ///
    /// Only the owner may edit a profile.
    #[must_use]
    pub fn can_edit(&self, employee: &Employee) -> bool {
        self.email == employee.email
    }

    /// Fail with `Forbidden` unless [`CurrentUser::can_edit`] holds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the user does not own `employee`.
    pub fn authorize_edit(&self, employee: &Employee) -> Result<(), AppError> {
        if self.can_edit(employee) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Email of the signed-in user.
    pub const AUTHENTICATED_USER: &str = "authenticated_user";

    /// OAuth CSRF `state` while a sign-in is in flight.
    pub const OAUTH_STATE: &str = "oauth_state";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(email: &str) -> CurrentUser {
        CurrentUser::new(Email::parse(email).unwrap())
    }

    #[test]
    fn test_owner_can_edit() {
        let employee = Employee::new("Pat", Email::parse("pat@objectcomputing.com").unwrap());

        assert!(user("pat@objectcomputing.com").can_edit(&employee));
        assert!(user("pat@objectcomputing.com").authorize_edit(&employee).is_ok());

        assert!(!user("sam@objectcomputing.com").can_edit(&employee));
        assert!(matches!(
            user("sam@objectcomputing.com").authorize_edit(&employee),
            Err(AppError::Forbidden)
        ));
    }
}
