//! The backend-independent document storage contract.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use crate::error::Result;
use crate::reference::{document_extension, is_pending};

/// Bytes of a resolved document together with the MIME type to serve it as.
#[derive(Clone, Debug)]
pub struct ResolvedDocument {
    pub data: Bytes,
    pub content_type: String,
}

/// Storage for proof-of-identity documents.
///
/// Callers never branch on the backend; local and remote stores honour the
/// same contract:
///
/// | Method | Contract |
/// |--------|----------|
/// | [`put`](DocumentStore::put) | validate extension, write under a key derived from `(tenant, staff)` |
/// | [`replace`](DocumentStore::replace) | write the new artifact, then release the old one |
/// | [`delete`](DocumentStore::delete) | idempotent; pending or absent references are a no-op |
/// | [`resolve`](DocumentStore::resolve) | return the artifact bytes or `NotFound` |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Stores `data` for the staff member and returns the new reference.
    ///
    /// Fails with [`InvalidDocumentType`](crate::DocumentError::InvalidDocumentType)
    /// before touching storage if `filename` has a disallowed extension.
    async fn put(&self, tenant_id: i64, staff_id: i64, data: Bytes, filename: &str)
        -> Result<String>;

    /// Removes the artifact behind `reference`.
    async fn delete(&self, reference: &str) -> Result<()>;

    /// Fetches the artifact behind `reference`.
    async fn resolve(&self, reference: &str) -> Result<ResolvedDocument>;

    /// Replaces the artifact behind `existing` with a new upload.
    ///
    /// The new artifact is written first. If releasing the old one then
    /// fails, the new artifact is removed again and the error returned, so
    /// the old reference stays resolvable.
    async fn replace(
        &self,
        existing: &str,
        tenant_id: i64,
        staff_id: i64,
        data: Bytes,
        filename: &str,
    ) -> Result<String> {
        document_extension(filename)?;

        let new_ref = self.put(tenant_id, staff_id, data, filename).await?;
        if is_pending(existing) || existing == new_ref {
            return Ok(new_ref);
        }

        if let Err(e) = self.delete(existing).await {
            warn!(
                "[Documents] Failed to release {} during replace: {}",
                existing, e
            );
            if let Err(cleanup) = self.delete(&new_ref).await {
                warn!(
                    "[Documents] Failed to roll back new artifact {}: {}",
                    new_ref, cleanup
                );
            }
            return Err(e);
        }

        Ok(new_ref)
    }
}
