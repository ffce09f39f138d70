//! Auth Handlers and Module

pub mod auth;
pub mod auth_me;

pub use auth::{forgot_password, login, logout, register, reset_password};
pub use auth_me::{delete_me, me};
