//! Authentication middleware and extractors.
//!
//! The session marker is the `authenticated_user` key holding the signed-in
//! email. Its presence is the only test of "signed in".

use axum::{
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use satchel_core::Email;

use crate::models::{CurrentUser, session_keys};

/// Read the signed-in user from the session, if any.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<Email>(session_keys::AUTHENTICATED_USER)
        .await
        .ok()
        .flatten()
        .map(CurrentUser::new)
}

/// Whether the session carries the sign-in marker.
pub async fn is_authenticated(session: &Session) -> bool {
    current_user(session).await.is_some()
}

/// Middleware that stops unauthenticated requests with `401 Unauthorized`.
///
/// Applied with `route_layer` so unknown paths still 404.
pub async fn require_auth(session: Session, request: Request, next: Next) -> Response {
    if is_authenticated(&session).await {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(StatusCode::UNAUTHORIZED)?;

        current_user(session)
            .await
            .map(Self)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Extractor that optionally gets the signed-in user.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Record `email` as the signed-in user.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_authenticated_user(
    session: &Session,
    email: &Email,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::AUTHENTICATED_USER, email).await
}

/// Remove the sign-in marker (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_authenticated_user(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<Email>(session_keys::AUTHENTICATED_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_marker_round_trip() {
        let session = session();
        assert!(!is_authenticated(&session).await);

        let email = Email::parse("pat@objectcomputing.com").unwrap();
        set_authenticated_user(&session, &email).await.unwrap();
        assert!(is_authenticated(&session).await);
        assert_eq!(current_user(&session).await.unwrap().email, email);

        clear_authenticated_user(&session).await.unwrap();
        assert!(!is_authenticated(&session).await);
    }

    #[tokio::test]
    async fn test_clear_without_marker() {
        let session = session();
        clear_authenticated_user(&session).await.unwrap();
        assert!(!is_authenticated(&session).await);
    }
}
