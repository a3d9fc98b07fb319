//! Satchel Core - Shared domain types.
//!
//! This crate provides the types used across all Satchel components:
//! - `satchel` - The employee directory web server
//! - `satchel-cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, and the employee/reflection model

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
