#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use doc_store::{DocumentBackend, DocumentError, DocumentStore, ResolvedDocument};
use roster_server::core::auth::Registration;
use roster_server::core::db;
use roster_server::core::mail::{ResetContext, ResetNotifier};
use roster_server::core::{AppState, ServerConfig};
use roster_server::staff::FieldInput;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const PASSWORD: &str = "Aa1!aaaa";

/// Keeps every delivered code so tests can complete the reset flow.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send(&self, recipient: &str, _ctx: &ResetContext, code: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), code.to_string()));
        Ok(())
    }
}

/// Delivery that always fails, like an unreachable webhook.
pub struct FailingNotifier;

#[async_trait]
impl ResetNotifier for FailingNotifier {
    async fn send(&self, _recipient: &str, _ctx: &ResetContext, _code: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("reset relay unreachable"))
    }
}

/// Wraps a real store but refuses every `put`.
pub struct RejectingPutStore(pub Arc<dyn DocumentStore>);

#[async_trait]
impl DocumentStore for RejectingPutStore {
    fn backend_name(&self) -> &'static str {
        "rejecting"
    }

    async fn put(
        &self,
        _tenant_id: i64,
        _staff_id: i64,
        _data: Bytes,
        _filename: &str,
    ) -> doc_store::Result<String> {
        Err(DocumentError::Unavailable("store is refusing writes".into()))
    }

    async fn delete(&self, reference: &str) -> doc_store::Result<()> {
        self.0.delete(reference).await
    }

    async fn resolve(&self, reference: &str) -> doc_store::Result<ResolvedDocument> {
        self.0.resolve(reference).await
    }
}

type StoreWrapper = fn(Arc<dyn DocumentStore>) -> Arc<dyn DocumentStore>;

pub struct Harness {
    pub state: AppState,
    pub pool: SqlitePool,
    pub notifier: Arc<RecordingNotifier>,
    pub dir: TempDir,
}

impl Harness {
    /// In-memory database, local documents, recording notifier.
    pub async fn new() -> Self {
        Self::assemble(false, None, None).await
    }

    /// File-backed database so several connections can contend for it.
    pub async fn on_disk() -> Self {
        Self::assemble(true, None, None).await
    }

    pub async fn with_notifier(notifier: Arc<dyn ResetNotifier>) -> Self {
        Self::assemble(false, Some(notifier), None).await
    }

    pub async fn with_store(wrap: StoreWrapper) -> Self {
        Self::assemble(false, None, Some(wrap)).await
    }

    async fn assemble(
        on_disk: bool,
        notifier: Option<Arc<dyn ResetNotifier>>,
        wrap: Option<StoreWrapper>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pool = if on_disk {
            let url = format!("sqlite:{}", dir.path().join("roster.sqlite").display());
            db::connect(&url).await.unwrap()
        } else {
            db::connect_in_memory().await.unwrap()
        };

        let mut config = ServerConfig::with_base_dir(dir.path());
        config.jwt_secret = "test-secret".into();
        config.password_hash_cost = Some(4);
        config.documents = DocumentBackend::Local {
            root: dir.path().join("uploads"),
        };

        let mut documents = doc_store::open(config.documents.clone()).await.unwrap();
        if let Some(wrap) = wrap {
            documents = wrap(documents);
        }
        let recording = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn ResetNotifier> = match notifier {
            Some(notifier) => notifier,
            None => recording.clone(),
        };
        let state = AppState::new(config, pool.clone(), documents, notifier);

        Self {
            state,
            pool,
            notifier: recording,
            dir,
        }
    }

    pub fn uploads(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Registers a boss and returns its id.
    pub async fn boss(&self, email: &str) -> i64 {
        let info = self
            .state
            .auth
            .register(Registration {
                email: email.into(),
                password: PASSWORD.into(),
                company_name: "Acme".into(),
                firstname: "Alice".into(),
                lastname: "Boss".into(),
            })
            .await
            .unwrap();
        info.id
    }
}

pub fn staff_input(firstname: &str, lastname: &str, ni: &str) -> FieldInput {
    [
        ("firstname", firstname),
        ("lastname", lastname),
        ("national_insurance_number", ni),
        ("home_address", "1 High Street"),
        ("telephone_number", "07700900123"),
        ("employment_status", "Full-time"),
        ("immigration_status", "Citizen"),
        ("visa_type", "None"),
        ("visa_sharecode", "N/A"),
        ("sex", "Female"),
        ("date_of_birth", "1990-04-01"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn with(mut input: FieldInput, key: &str, value: &str) -> FieldInput {
    input.insert(key.to_string(), value.to_string());
    input
}
