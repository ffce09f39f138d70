//! Roster server configuration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use doc_store::{DocumentBackend, DocumentStore, RemoteConfig};
use sqlx::SqlitePool;
use tracing::warn;

use crate::core::auth::credentials::CredentialStore;
use crate::core::auth::session::SessionIssuer;
use crate::core::auth::AuthManager;
use crate::core::mail::ResetNotifier;
use crate::staff::StaffRegistry;

pub const DEFAULT_JWT_SECRET: &str = "dev-secret-key";

/// Configuration for the roster server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Data root holding `local/` and `uploads/`
    pub root: PathBuf,
    /// SQLite connection URL
    pub database_url: String,
    /// HMAC key for session tokens
    pub jwt_secret: String,
    /// Where proof-of-ID documents live
    pub documents: DocumentBackend,
    /// Reset codes are POSTed here when set, otherwise logged
    pub reset_webhook_url: Option<String>,
    /// Listen port
    pub port: u16,
    /// Request body limit in MB
    pub max_upload_mb: usize,
    /// bcrypt cost; `None` uses the library default
    pub password_hash_cost: Option<u32>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_var(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("[Config] Ignoring unparseable {}={:?}", name, raw);
            None
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_base_dir(roster_common::roster_root())
    }
}

impl ServerConfig {
    /// Build the config for `root`, letting environment variables override.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let root = base_dir.into();

        let database_url = env_var("DATABASE_URL").unwrap_or_else(|| {
            format!("sqlite:{}", roster_common::db_path_in(&root).display())
        });

        let jwt_secret = env_var("JWT_SECRET").unwrap_or_else(|| {
            warn!("[Config] JWT_SECRET not set, using the development key");
            DEFAULT_JWT_SECRET.to_string()
        });

        let documents = match env_var("DOCUMENT_BACKEND").as_deref() {
            Some("remote") => match env_var("DOCUMENT_REMOTE_URL") {
                Some(url) => {
                    let mut remote = RemoteConfig::new(url);
                    remote.api_key = env_var("DOCUMENT_REMOTE_KEY");
                    if let Some(secs) = env_parse::<u64>("DOCUMENT_REMOTE_TIMEOUT_SECS") {
                        remote.timeout = Duration::from_secs(secs);
                    }
                    DocumentBackend::Remote(remote)
                }
                None => {
                    warn!("[Config] DOCUMENT_REMOTE_URL not set, using local documents");
                    DocumentBackend::Local {
                        root: roster_common::uploads_dir_in(&root),
                    }
                }
            },
            Some("local") | None => DocumentBackend::Local {
                root: roster_common::uploads_dir_in(&root),
            },
            Some(other) => {
                warn!("[Config] Unknown DOCUMENT_BACKEND {:?}, using local", other);
                DocumentBackend::Local {
                    root: roster_common::uploads_dir_in(&root),
                }
            }
        };

        Self {
            database_url,
            jwt_secret,
            documents,
            reset_webhook_url: env_var("RESET_WEBHOOK_URL"),
            port: env_parse("PORT").unwrap_or(5000),
            max_upload_mb: env_parse("MAX_UPLOAD_MB").unwrap_or(16),
            password_hash_cost: env_parse("PASSWORD_HASH_COST"),
            root,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub auth: Arc<AuthManager>,
    pub staff: Arc<StaffRegistry>,
}

impl AppState {
    /// Wire the services over one pool and one document store.
    pub fn new(
        config: ServerConfig,
        pool: SqlitePool,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        let mut credentials = CredentialStore::new(pool.clone());
        if let Some(cost) = config.password_hash_cost {
            credentials = credentials.with_cost(cost);
        }
        let sessions = SessionIssuer::new(config.jwt_secret.as_bytes());

        let auth = AuthManager::new(
            pool.clone(),
            credentials,
            sessions,
            notifier,
            documents.clone(),
        );
        let staff = StaffRegistry::new(pool, documents);

        Self {
            config,
            auth: Arc::new(auth),
            staff: Arc::new(staff),
        }
    }
}
