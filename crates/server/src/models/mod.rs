//! Request-scoped models for Satchel.
//!
//! Domain types (`Employee`, `Reflection`, `Email`) live in `satchel-core`.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
