//! Local-disk document backend.
//!
//! References are bare filenames inside the upload directory.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{DocumentError, Result};
use crate::reference::{content_type_for, document_extension, document_name, is_pending};
use crate::store::{DocumentStore, ResolvedDocument};

#[derive(Clone, Debug)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub async fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a reference to a path, refusing anything that could escape the root.
    fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let safe = !reference.is_empty()
            && !reference.contains(['/', '\\'])
            && reference != "."
            && reference != "..";
        safe.then(|| self.root.join(reference))
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn put(
        &self,
        tenant_id: i64,
        staff_id: i64,
        data: Bytes,
        filename: &str,
    ) -> Result<String> {
        let ext = document_extension(filename)?;
        let name = document_name(tenant_id, staff_id, &ext);

        atomic_write(&self.root.join(&name), &data, &self.root.join("tmp")).await?;

        info!("[Documents] Stored {} ({} bytes) on disk", name, data.len());
        Ok(name)
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        if is_pending(reference) {
            return Ok(());
        }
        let Some(path) = self.path_for(reference) else {
            debug!("[Documents] Ignoring delete of foreign reference {:?}", reference);
            return Ok(());
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("[Documents] Removed {}", reference);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DocumentError::Io(e)),
        }
    }

    async fn resolve(&self, reference: &str) -> Result<ResolvedDocument> {
        let path = self
            .path_for(reference)
            .filter(|_| !is_pending(reference))
            .ok_or_else(|| DocumentError::NotFound(reference.to_string()))?;

        match fs::read(&path).await {
            Ok(data) => Ok(ResolvedDocument {
                data: Bytes::from(data),
                content_type: content_type_for(reference).to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(DocumentError::NotFound(reference.to_string()))
            }
            Err(e) => Err(DocumentError::Io(e)),
        }
    }
}

/// Writes to a temp file and renames it over `dest`, so readers see either
/// the old artifact or the complete new one.
pub async fn atomic_write(dest: &Path, data: &[u8], temp_folder: &Path) -> Result<()> {
    fs::create_dir_all(temp_folder).await?;

    let temp_path = temp_folder.join(format!("tmp_{}", uuid::Uuid::new_v4()));
    fs::write(&temp_path, data).await?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    if let Err(e) = fs::rename(&temp_path, dest).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(DocumentError::Io(e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_resolve() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();

        let reference = store
            .put(1, 7, Bytes::from_static(b"%PDF-1.4"), "Passport.PDF")
            .await
            .unwrap();
        assert_eq!(reference, "tenant_1_staff_7_id.pdf");

        let doc = store.resolve(&reference).await.unwrap();
        assert_eq!(doc.data.as_ref(), b"%PDF-1.4");
        assert_eq!(doc.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_put_rejects_bad_extension_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();

        let err = store
            .put(1, 7, Bytes::from_static(b"MZ"), "setup.exe")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidDocumentType(_)));
        assert!(!temp_dir.path().join("tenant_1_staff_7_id.exe").exists());
    }

    #[tokio::test]
    async fn test_repeated_put_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();

        let first = store.put(2, 3, Bytes::from_static(b"one"), "a.png").await.unwrap();
        let second = store.put(2, 3, Bytes::from_static(b"two"), "b.png").await.unwrap();
        assert_eq!(first, second);

        let doc = store.resolve(&second).await.unwrap();
        assert_eq!(doc.data.as_ref(), b"two");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();

        let reference = store.put(1, 1, Bytes::from_static(b"x"), "id.jpg").await.unwrap();
        store.delete(&reference).await.unwrap();
        store.delete(&reference).await.unwrap();
        store.delete(crate::PENDING).await.unwrap();

        assert!(matches!(
            store.resolve(&reference).await,
            Err(DocumentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_refuses_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalDocumentStore::new(temp_dir.path().join("uploads"))
            .await
            .unwrap();
        std::fs::write(temp_dir.path().join("secret.pdf"), b"secret").unwrap();

        assert!(matches!(
            store.resolve("../secret.pdf").await,
            Err(DocumentError::NotFound(_))
        ));
        assert!(matches!(
            store.resolve(crate::PENDING).await,
            Err(DocumentError::NotFound(_))
        ));
    }
}
