//! Satchel employee directory library.
//!
//! The web application (roster, profiles, reflections and sign-in) as a
//! library, so the binary, the CLI and the integration tests share it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
