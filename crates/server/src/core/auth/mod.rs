//! Tenant (boss) accounts.
//!
//! Handles registration, login, the password-reset sequence, and account
//! deletion. Data lives in the `boss` table; owned staff rows cascade.

pub mod credentials;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod session;

use chrono::{DateTime, Utc};
use doc_store::DocumentStore;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::db;
use crate::core::error::{Error, Result};
use crate::core::mail::{ResetContext, ResetNotifier};
use credentials::{CredentialStore, RESET_CODE_TTL_MINUTES};
use policy::{email_violation, normalize_email, password_violations};
use session::{Session, SessionIssuer};

/// Boss row as stored. Holds the digest, so it is never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Boss {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub company_name: String,
    pub firstname: String,
    pub lastname: String,
    pub created_at: DateTime<Utc>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
}

/// Public profile (no sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BossInfo {
    pub id: i64,
    pub email: String,
    pub company_name: String,
    pub firstname: String,
    pub lastname: String,
    pub created_at: DateTime<Utc>,
}

impl From<Boss> for BossInfo {
    fn from(boss: Boss) -> Self {
        Self {
            id: boss.id,
            email: boss.email,
            company_name: boss.company_name,
            firstname: boss.firstname,
            lastname: boss.lastname,
            created_at: boss.created_at,
        }
    }
}

/// Missing fields deserialize as empty so they are reported with the rest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub company_name: String,
    pub firstname: String,
    pub lastname: String,
}

/// Auth manager handles all tenant authentication
pub struct AuthManager {
    pool: SqlitePool,
    credentials: CredentialStore,
    sessions: SessionIssuer,
    notifier: Arc<dyn ResetNotifier>,
    documents: Arc<dyn DocumentStore>,
}

impl AuthManager {
    pub fn new(
        pool: SqlitePool,
        credentials: CredentialStore,
        sessions: SessionIssuer,
        notifier: Arc<dyn ResetNotifier>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            pool,
            credentials,
            sessions,
            notifier,
            documents,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Register a new tenant
    pub async fn register(&self, req: Registration) -> Result<BossInfo> {
        let email = normalize_email(&req.email);

        let mut reasons = Vec::new();
        for (field, value) in [
            ("email", email.as_str()),
            ("company_name", req.company_name.trim()),
            ("firstname", req.firstname.trim()),
            ("lastname", req.lastname.trim()),
        ] {
            if value.is_empty() {
                reasons.push(format!("{} is required", field));
            }
        }
        if !email.is_empty() {
            reasons.extend(email_violation(&email));
        }
        reasons.extend(password_violations(&req.password));
        if !reasons.is_empty() {
            return Err(Error::Validation(reasons));
        }

        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM boss WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(Error::DuplicateIdentifier("Email already exists".into()));
        }

        let password_hash = self.credentials.hash(&req.password)?;

        // The UNIQUE(email) constraint settles a concurrent duplicate.
        let boss: Boss = sqlx::query_as(
            r#"
            INSERT INTO boss (email, password_hash, company_name, firstname, lastname, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(req.company_name.trim())
        .bind(req.firstname.trim())
        .bind(req.lastname.trim())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!("[Auth] Boss registered: {} ({})", boss.company_name, boss.email);
        Ok(boss.into())
    }

    /// Verify credentials and mint a session token
    pub async fn login(&self, email: &str, password: &str) -> Result<(BossInfo, Session)> {
        let boss = self.find_by_email(email).await?;

        let Some(boss) = boss else {
            warn!("[Auth] Failed login attempt for unknown account");
            return Err(Error::InvalidCredentials);
        };
        if !self.credentials.verify(password, &boss.password_hash) {
            warn!("[Auth] Failed login attempt for {}", boss.email);
            return Err(Error::InvalidCredentials);
        }

        let session = self.sessions.issue(boss.id)?;
        info!("[Auth] Boss logged in: {}", boss.email);
        Ok((boss.into(), session))
    }

    /// Validate a bearer token and return the boss id it names
    pub fn authenticate(&self, token: &str) -> Result<i64> {
        self.sessions.verify(token)
    }

    /// Issue a reset code and hand it to the notifier.
    ///
    /// Unknown emails succeed silently so callers cannot enumerate accounts.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let Some(boss) = self.find_by_email(email).await? else {
            info!("[Auth] Reset requested for unknown account");
            return Ok(());
        };

        let code = self.credentials.issue_reset_code(boss.id).await?;

        let context = ResetContext {
            firstname: boss.firstname.clone(),
            company_name: boss.company_name.clone(),
            expires_in_minutes: RESET_CODE_TTL_MINUTES,
        };
        if let Err(e) = self.notifier.send(&boss.email, &context, &code).await {
            warn!("[Auth] Reset notification for {} failed: {:#}", boss.email, e);
        }
        Ok(())
    }

    /// Complete the reset sequence: check the code, then set the new password.
    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> Result<()> {
        let boss = self
            .credentials
            .verify_reset_code(email, code.trim())
            .await?
            .ok_or_else(|| Error::invalid("Invalid or expired code"))?;

        let reasons = password_violations(new_password);
        if !reasons.is_empty() {
            return Err(Error::Validation(reasons));
        }

        self.credentials.rotate_password(boss.id, new_password).await?;
        info!("[Auth] Password reset for {}", boss.email);
        Ok(())
    }

    /// Get boss profile by ID
    pub async fn get_boss(&self, boss_id: i64) -> Result<BossInfo> {
        let boss: Option<Boss> = sqlx::query_as("SELECT * FROM boss WHERE id = ?")
            .bind(boss_id)
            .fetch_optional(&self.pool)
            .await?;

        boss.map(BossInfo::from).ok_or(Error::NotFound)
    }

    /// Delete the tenant and everything it owns.
    ///
    /// Rows go in one transaction (staff cascade); documents are released
    /// after commit and failures there are only logged.
    pub async fn delete_account(&self, boss_id: i64) -> Result<()> {
        let mut tx = self.pool.begin_with(db::BEGIN_WRITE).await?;

        let references: Vec<(String,)> =
            sqlx::query_as("SELECT proof_of_id FROM staff WHERE boss_id = ?")
                .bind(boss_id)
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM boss WHERE id = ?")
            .bind(boss_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        tx.commit().await?;

        for (reference,) in &references {
            if let Err(e) = self.documents.delete(reference).await {
                warn!("[Auth] Leaked document {} of deleted boss {}: {}", reference, boss_id, e);
            }
        }

        info!(
            "[Auth] Boss {} deleted with {} staff records",
            boss_id,
            references.len()
        );
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Boss>> {
        Ok(sqlx::query_as("SELECT * FROM boss WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?)
    }
}
