//! HTTP middleware stack for Satchel.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added by the binary)
//! 2. `TraceLayer` (request span with method, URI and request id)
//! 3. Request ID (stamp `x-request-id` into span, Sentry scope and response)
//! 4. Security headers (CSP, frame and isolation headers)
//! 5. Session layer (tower-sessions)
//! 6. `require_auth` (route layer on protected routes only)

pub mod auth;
pub mod htmx;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, clear_authenticated_user, current_user, is_authenticated,
    require_auth, set_authenticated_user,
};
pub use htmx::HxRequest;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, postgres_store};
