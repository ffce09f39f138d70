use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

pub async fn mw_require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    debug!("MIDDLEWARE: require_auth");

    let auth_header = match req.headers().get(header::AUTHORIZATION) {
        Some(h) => h
            .to_str()
            .map_err(|_| Error::Unauthorized("auth token wrong format"))?,
        None => return Err(Error::Unauthorized("no auth token found")),
    };

    // Format: "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Error::Unauthorized("auth token wrong format"))?;

    let boss_id = state.auth.authenticate(token)?;

    req.extensions_mut().insert(Ctx::new(boss_id));

    Ok(next.run(req).await)
}
