//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during sign-in.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No identity provider is registered under this name.
    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),

    /// The provider rejected the request or returned unusable data.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// The user declined, or the provider reported an error on the callback.
    #[error("sign-in denied: {0}")]
    Denied(String),

    /// The callback's state does not match the one stored at login.
    #[error("invalid session state")]
    InvalidState,

    /// Session store failure.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Repository/database error while provisioning the profile.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        Self::Provider(e.to_string())
    }
}
