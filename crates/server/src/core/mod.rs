//! Core Service Layer
//!
//! Shared infrastructure for the roster server: tenant authentication,
//! configuration, persistence, reset-code delivery, and the error type.

pub mod auth;
pub mod config;
pub mod ctx;
pub mod db;
pub mod error;
pub mod mail;
pub mod router;

// Re-exports for convenience
pub use config::{AppState, ServerConfig};
pub use ctx::Ctx;
pub use error::{Error, Result};
pub use router::router;
