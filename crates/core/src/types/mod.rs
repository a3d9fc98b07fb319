//! Core types for Satchel.
//!
//! This module provides type-safe wrappers for the directory's domain concepts.

pub mod email;
pub mod employee;
pub mod id;

pub use email::{Email, EmailError};
pub use employee::{Employee, Reflection};
pub use id::*;
