//! Authentication route handlers.
//!
//! Sign-in is delegated to an identity provider (Google in production).
//! The callback checks the CSRF state, applies the domain allow-list and
//! provisions a profile on first sign-in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use satchel_core::Email;

use super::LayoutView;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    HxRequest, OptionalAuth, clear_authenticated_user, is_authenticated, set_authenticated_user,
};
use crate::models::session_keys;
use crate::services::auth::{AuthError, STATE_LENGTH, generate_state, provision_employee};
use crate::state::AppState;

/// Query parameters the provider sends back to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Shown when the account's domain is not on the allow-list.
#[derive(Template, WebTemplate)]
#[template(path = "forbidden.html")]
pub struct ForbiddenTemplate {
    pub layout: LayoutView,
}

/// Start sign-in with `provider`.
///
/// # Route
///
/// `GET /auth/{provider}/login`
#[instrument(skip(state, session))]
pub async fn login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    session: Session,
) -> Result<Response, AppError> {
    let provider = state.providers().get(&provider)?;

    if is_authenticated(&session).await {
        return Ok(Redirect::to("/").into_response());
    }

    let oauth_state = generate_state(STATE_LENGTH);
    session
        .insert(session_keys::OAUTH_STATE, &oauth_state)
        .await
        .map_err(AuthError::from)?;

    Ok(Redirect::to(&provider.authorization_url(&oauth_state)).into_response())
}

/// Complete sign-in.
///
/// # Route
///
/// `GET /auth/{provider}/callback?code=...&state=...`
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let provider = state.providers().get(&provider)?;

    // The stored state is single-use whatever the outcome.
    let expected = session
        .remove::<String>(session_keys::OAUTH_STATE)
        .await
        .map_err(AuthError::from)?;

    if let Some(error) = query.error {
        let detail = query
            .error_description
            .map_or_else(|| error.clone(), |d| format!("{error}: {d}"));
        return Err(AuthError::Denied(detail).into());
    }

    let returned = query.state.ok_or(AuthError::InvalidState)?;
    if expected.as_deref() != Some(returned.as_str()) {
        return Err(AuthError::InvalidState.into());
    }

    let code = query
        .code
        .ok_or_else(|| AuthError::Provider("callback is missing the authorization code".to_owned()))?;

    let identity = provider.exchange(&code).await?;

    if !state.allowed_domains().is_allowed(&identity.email) {
        tracing::warn!(email = %identity.email, "sign-in from a domain that is not allowed");
        session.flush().await.map_err(AuthError::from)?;
        return Ok(Redirect::to("/forbidden").into_response());
    }

    let email = Email::parse(&identity.email)
        .map_err(|e| AuthError::Provider(format!("{}: {e}", identity.email)))?;

    set_authenticated_user(&session, &email)
        .await
        .map_err(AuthError::from)?;
    set_sentry_user(email.as_str());

    provision_employee(
        state.directory(),
        &identity,
        &state.config().auth.starter_reflections,
    )
    .await?;

    tracing::info!(email = %email, provider = provider.name(), "signed in");
    Ok(Redirect::to("/").into_response())
}

/// Sign out.
///
/// # Route
///
/// `GET /auth/logout`
///
/// Always redirects home, even when the session store cannot be reached.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_authenticated_user(&session).await {
        tracing::warn!(error = %e, "failed to clear session on logout");
    }
    clear_sentry_user();
    Redirect::to("/")
}

/// Domain rejection page.
///
/// # Route
///
/// `GET /forbidden`
pub async fn forbidden(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    HxRequest(is_htmx): HxRequest,
) -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        ForbiddenTemplate {
            layout: LayoutView::new(&state, user.as_ref(), is_htmx),
        },
    )
}
