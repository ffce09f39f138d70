//! Document reference helpers shared by every backend.
//!
//! A reference is an opaque string stored on the staff record. It is either
//! the [`PENDING`] sentinel, a local filename, or a remote locator.

use crate::error::{DocumentError, Result};

/// Reference value for a staff record that has no document yet.
pub const PENDING: &str = "pending_upload";

/// Extensions accepted for proof-of-identity documents.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// Returns `true` if the reference means "no document attached".
pub fn is_pending(reference: &str) -> bool {
    reference.is_empty() || reference == PENDING
}

/// Validates the declared filename and returns its lower-cased extension.
pub fn document_extension(filename: &str) -> Result<String> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| DocumentError::InvalidDocumentType(filename.to_string()))?;

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(DocumentError::InvalidDocumentType(filename.to_string()))
    }
}

/// Deterministic storage key for a staff member's document.
///
/// Repeated uploads for the same staff member land on the same key.
pub fn document_key(tenant_id: i64, staff_id: i64) -> String {
    format!("tenant_{}_staff_{}_id", tenant_id, staff_id)
}

/// Key plus extension, the name under which the artifact is written.
pub fn document_name(tenant_id: i64, staff_id: i64, ext: &str) -> String {
    format!("{}.{}", document_key(tenant_id, staff_id), ext)
}

/// MIME type served for a stored document, derived from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    match name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
