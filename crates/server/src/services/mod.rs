//! Business logic services for Satchel.
//!
//! # Services
//!
//! - `auth` - OAuth sign-in, domain allow-list and profile provisioning

pub mod auth;
