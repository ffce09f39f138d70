use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use doc_store::DocumentError;
use serde_json::json;
use tracing::error;

/// Failure kinds surfaced by every service and handler.
///
/// `NotFound` is used both for missing records and for records owned by
/// another tenant. Messages never carry codes, hashes, or tokens.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Input errors
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDateFormat,
    #[error("{0}")]
    DuplicateIdentifier(String),
    #[error("Invalid file type for {0:?}. Allowed: PDF, PNG, JPG, JPEG")]
    InvalidDocumentType(String),

    // Lookup
    #[error("Not found")]
    NotFound,

    // Auth errors
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("Auth context missing")]
    AuthCtxMissing,

    // Backend
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Single-reason validation failure.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Error::Validation(vec![reason.into()])
    }

    /// Stable machine-checkable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::InvalidDateFormat => "invalid_date_format",
            Error::DuplicateIdentifier(_) => "duplicate_identifier",
            Error::InvalidDocumentType(_) => "invalid_document_type",
            Error::NotFound => "not_found",
            Error::InvalidCredentials => "invalid_credentials",
            Error::Unauthorized(_) => "unauthorized",
            Error::AuthCtxMissing | Error::Internal(_) => "internal",
            Error::StorageUnavailable(_) => "storage_unavailable",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_))
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InvalidDateFormat => StatusCode::BAD_REQUEST,
            Error::DuplicateIdentifier(_) => StatusCode::CONFLICT,
            Error::InvalidDocumentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidCredentials | Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::AuthCtxMissing | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the log.
        let message = match &self {
            Error::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            Error::StorageUnavailable(detail) => {
                error!("Storage unavailable: {}", detail);
                "Document storage is temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": {
                "kind": self.kind(),
                "message": message,
                "retryable": self.is_retryable(),
            }
        });
        if let Error::Validation(reasons) = &self {
            body["error"]["reasons"] = json!(reasons);
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Error::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let message = db.message();
                if message.contains("national_insurance_number") {
                    Error::DuplicateIdentifier("National Insurance Number already exists".into())
                } else if message.contains("email") {
                    Error::DuplicateIdentifier("Email already exists".into())
                } else {
                    Error::DuplicateIdentifier("Record already exists".into())
                }
            }
            // The owning boss is gone, e.g. deleted mid-request.
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => Error::NotFound,
            sqlx::Error::Database(db) if is_contention(db.code().as_deref()) => {
                Error::StorageUnavailable(err.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                Error::StorageUnavailable(err.to_string())
            }
            _ => Error::Internal(err.to_string()),
        }
    }
}

/// SQLITE_BUSY or SQLITE_LOCKED, including their extended codes.
fn is_contention(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .is_some_and(|c| matches!(c & 0xff, 5 | 6))
}

impl From<DocumentError> for Error {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::InvalidDocumentType(name) => Error::InvalidDocumentType(name),
            DocumentError::NotFound(_) => Error::NotFound,
            other if other.is_retryable() => Error::StorageUnavailable(other.to_string()),
            other => Error::Internal(other.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for Error {
    fn from(err: bcrypt::BcryptError) -> Self {
        Error::Internal(format!("password hashing failed: {}", err))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
