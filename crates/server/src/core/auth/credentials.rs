//! Password digests and one-time reset codes.
//!
//! Hashing and verification are pure. Reset codes live on the `boss` row
//! (`reset_token`, `reset_token_expiry`), set and cleared together.

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::policy::normalize_email;
use super::Boss;
use crate::core::error::{Error, Result};

/// Lifetime of a reset code.
pub const RESET_CODE_TTL_MINUTES: i64 = 15;

#[derive(Clone, Debug)]
pub struct CredentialStore {
    pool: SqlitePool,
    cost: u32,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            cost: DEFAULT_COST,
        }
    }

    /// Overrides the bcrypt cost factor.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// One-way salted digest of `password`.
    pub fn hash(&self, password: &str) -> Result<String> {
        Ok(hash(password, self.cost)?)
    }

    /// A malformed digest verifies as `false`.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        verify(password, digest).unwrap_or(false)
    }

    /// Sets a new password digest and drops any pending reset code.
    pub async fn rotate_password(&self, boss_id: i64, password: &str) -> Result<()> {
        let digest = self.hash(password)?;
        let result = sqlx::query(
            "UPDATE boss SET password_hash = ?, reset_token = NULL, reset_token_expiry = NULL WHERE id = ?",
        )
        .bind(digest)
        .bind(boss_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    pub async fn issue_reset_code(&self, boss_id: i64) -> Result<String> {
        self.issue_reset_code_at(boss_id, Utc::now()).await
    }

    /// Generates a six-digit code valid until `now + 15min` and persists it
    /// immediately, replacing any earlier code.
    pub async fn issue_reset_code_at(&self, boss_id: i64, now: DateTime<Utc>) -> Result<String> {
        let code = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
        let expiry = now + Duration::minutes(RESET_CODE_TTL_MINUTES);

        let result =
            sqlx::query("UPDATE boss SET reset_token = ?, reset_token_expiry = ? WHERE id = ?")
                .bind(&code)
                .bind(expiry)
                .bind(boss_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        info!("[Auth] Reset code issued for boss {}", boss_id);
        Ok(code)
    }

    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<Option<Boss>> {
        self.verify_reset_code_at(email, code, Utc::now()).await
    }

    /// Returns the tenant if `code` exactly matches its live reset code.
    ///
    /// An expired code is cleared on the way out, so it can never validate
    /// later.
    pub async fn verify_reset_code_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Boss>> {
        let boss: Option<Boss> = sqlx::query_as("SELECT * FROM boss WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        let Some(boss) = boss else {
            return Ok(None);
        };

        let (stored, expiry) = match (&boss.reset_token, boss.reset_token_expiry) {
            (Some(stored), Some(expiry)) => (stored, expiry),
            (None, None) => return Ok(None),
            _ => {
                // Half-set state is never valid.
                self.clear_reset_code(boss.id).await?;
                return Ok(None);
            }
        };

        if now > expiry {
            debug!("[Auth] Reset code for boss {} expired", boss.id);
            self.clear_reset_code(boss.id).await?;
            return Ok(None);
        }

        if codes_match(stored, code) {
            Ok(Some(boss))
        } else {
            Ok(None)
        }
    }

    /// Idempotent.
    pub async fn clear_reset_code(&self, boss_id: i64) -> Result<()> {
        sqlx::query("UPDATE boss SET reset_token = NULL, reset_token_expiry = NULL WHERE id = ?")
            .bind(boss_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn codes_match(stored: &str, given: &str) -> bool {
    stored.len() == given.len()
        && stored
            .bytes()
            .zip(given.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
