//! Proof-of-identity document storage.
//!
//! [`DocumentStore`] is the contract the staff registry talks to. Two
//! backends implement it: [`LocalDocumentStore`] (files in an upload
//! directory) and [`RemoteDocumentStore`] (an HTTP blob service). Which one
//! is active is a deployment decision made once through [`open`].

pub mod error;
pub mod local;
pub mod reference;
pub mod remote;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

pub use error::{DocumentError, Result};
pub use local::LocalDocumentStore;
pub use reference::{document_extension, is_pending, ALLOWED_EXTENSIONS, PENDING};
pub use remote::{RemoteConfig, RemoteDocumentStore};
pub use store::{DocumentStore, ResolvedDocument};

/// Backend selection.
#[derive(Clone, Debug)]
pub enum DocumentBackend {
    Local { root: PathBuf },
    Remote(RemoteConfig),
}

/// Builds the configured backend behind the shared trait object.
pub async fn open(backend: DocumentBackend) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match backend {
        DocumentBackend::Local { root } => Arc::new(LocalDocumentStore::new(root).await?),
        DocumentBackend::Remote(config) => Arc::new(RemoteDocumentStore::new(config)?),
    };
    tracing::info!("[Documents] Using {} backend", store.backend_name());
    Ok(store)
}
