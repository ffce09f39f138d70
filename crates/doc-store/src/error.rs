//! Error types for document storage operations.

use std::io;
use thiserror::Error;

/// Result type for document storage operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur while storing or resolving documents.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DocumentError {
    /// The declared filename does not carry an allowed extension.
    #[error("Invalid file type for {0:?}. Allowed: PDF, PNG, JPG, JPEG")]
    InvalidDocumentType(String),

    /// No artifact exists for the reference.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The backend could not be reached or answered with something unusable.
    #[error("Document storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for DocumentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DocumentError::Unavailable("remote document service timed out".to_string())
        } else {
            DocumentError::Unavailable(err.to_string())
        }
    }
}

impl DocumentError {
    /// Check if this error is retryable.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, DocumentError::Unavailable(_) | DocumentError::Io(_))
    }
}
