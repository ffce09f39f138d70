use crate::core::error::{Error, Result};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Identity of the authenticated tenant, placed in request extensions by
/// [`mw_require_auth`](crate::core::auth::middleware::mw_require_auth).
#[derive(Clone, Debug)]
pub struct Ctx {
    boss_id: i64,
}

impl Ctx {
    pub fn new(boss_id: i64) -> Self {
        Self { boss_id }
    }

    pub fn boss_id(&self) -> i64 {
        self.boss_id
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(Error::AuthCtxMissing)
    }
}
