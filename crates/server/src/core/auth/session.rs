//! Stateless bearer tokens bound to a tenant id.
//!
//! Tokens are HS256 JWTs whose only application claim is `sub` (the boss
//! id). There is no revocation list; logout is the client discarding the
//! token.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// A freshly minted token.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub boss_id: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::hours(SESSION_TTL_HOURS),
        }
    }

    pub fn issue(&self, boss_id: i64) -> Result<Session> {
        self.issue_at(boss_id, Utc::now())
    }

    /// Mints a token valid for 24 hours from `now`.
    pub fn issue_at(&self, boss_id: i64, now: DateTime<Utc>) -> Result<Session> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: boss_id.to_string(),
            iat: now.timestamp().max(0) as usize,
            exp: expires_at.timestamp().max(0) as usize,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("token encoding failed: {}", e)))?;

        Ok(Session {
            token,
            boss_id,
            expires_at: Utc
                .timestamp_opt(claims.exp as i64, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    /// Recovers the boss id from a token without touching the database.
    pub fn verify(&self, token: &str) -> Result<i64> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| Error::Unauthorized("invalid or expired token"))?;

        data.claims
            .sub
            .parse::<i64>()
            .map_err(|_| Error::Unauthorized("invalid or expired token"))
    }
}
