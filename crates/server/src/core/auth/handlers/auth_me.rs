use crate::core::auth::BossInfo;
use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::Result;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

/// GET /api/me
pub async fn me(State(state): State<AppState>, ctx: Ctx) -> Result<Json<BossInfo>> {
    // The token is only trusted for the id; the profile is re-read.
    let boss = state.auth.get_boss(ctx.boss_id()).await?;

    Ok(Json(boss))
}

/// DELETE /api/me
pub async fn delete_me(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Value>> {
    state.auth.delete_account(ctx.boss_id()).await?;

    Ok(Json(json!({ "message": "Account deleted" })))
}
