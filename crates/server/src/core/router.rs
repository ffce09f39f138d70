//! Core Router
//!
//! Public auth routes plus everything behind the bearer-token middleware.

use crate::core::auth::handlers as auth_handlers;
use crate::core::auth::middleware::mw_require_auth;
use crate::core::AppState;
use crate::staff;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/logout", post(auth_handlers::logout))
        .route(
            "/api/me",
            get(auth_handlers::me).delete(auth_handlers::delete_me),
        )
        .merge(staff::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            mw_require_auth,
        ));

    Router::new()
        .route("/api/register", post(auth_handlers::register))
        .route("/api/login", post(auth_handlers::login))
        .route("/api/forgot-password", post(auth_handlers::forgot_password))
        .route("/api/reset-password", post(auth_handlers::reset_password))
        .route("/health", get(health_check))
        .merge(protected)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK - Roster Server"
}
