//! HTTP route handlers for Satchel.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                         - Roster (public)
//! GET    /forbidden                - Domain rejection page
//! GET    /health                   - Liveness
//! GET    /health/ready             - Readiness (backend reachable)
//!
//! # Auth
//! GET    /auth/{provider}/login    - Redirect to the identity provider
//! GET    /auth/{provider}/callback - Complete sign-in
//! GET    /auth/logout              - Clear the session marker
//!
//! # Profiles (requires auth)
//! GET    /employee/{email}         - Profile page
//! POST   /reflection               - Add a reflection to your own profile
//! DELETE /reflection/{id}          - Remove one of your reflections
//! POST   /profile/position         - Update your position
//! POST   /profile/bio              - Update your bio
//! ```
//!
//! Pages render inside the layout unless the request carries `HX-Request`.
//! Profile mutations always act on the signed-in user's own record and
//! answer with the re-rendered profile fragment.

pub mod auth;
pub mod employee;
pub mod home;


use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::{request_id_middleware, require_auth, security_headers_middleware};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Layout data shared by every full page.
#[derive(Debug, Clone)]
pub struct LayoutView {
    /// Render only the page body (htmx request).
    pub fragment: bool,
    pub authenticated_user: Option<String>,
    pub login_url: Option<String>,
}

impl LayoutView {
    #[must_use]
    pub fn new(state: &AppState, user: Option<&CurrentUser>, fragment: bool) -> Self {
        Self {
            fragment,
            authenticated_user: user.map(|u| u.email.to_string()),
            login_url: state
                .providers()
                .names()
                .first()
                .map(|name| format!("/auth/{name}/login")),
        }
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/{provider}/login", get(auth::login))
        .route("/{provider}/callback", get(auth::callback))
        .route("/logout", get(auth::logout))
}

/// Create the routes that require a signed-in user.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/employee/{email}", get(employee::show))
        .route("/reflection", post(employee::add_reflection))
        .route("/reflection/{id}", delete(employee::delete_reflection))
        .route("/profile/position", post(employee::save_position))
        .route("/profile/bio", post(employee::save_bio))
        .route_layer(from_fn(require_auth))
}

/// Create all routes for Satchel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::roster))
        .route("/forbidden", get(auth::forbidden))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .merge(profile_routes())
}

/// Build the application with its middleware stack.
///
/// Sentry layers are left to the binary so tests run without a client.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    // ServiceBuilder applies layers top to bottom, outermost first.
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(session_layer);

    routes().layer(middleware).with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the directory backend does not answer.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.directory().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
