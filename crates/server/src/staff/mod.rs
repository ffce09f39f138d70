//! Staff roster owned by a tenant.
//!
//! Records carry personal and immigration fields plus a reference to a
//! proof-of-ID document held in the configured [`doc_store::DocumentStore`].

pub mod export;
pub mod fields;
pub mod handlers;
pub mod models;
pub mod registry;

use crate::core::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub use export::{ExportMode, ExportRow, RosterExport, EXPORT_COLUMNS};
pub use fields::FieldInput;
pub use models::{EmploymentStatus, Sex, StaffFields, StaffRecord, Upload};
pub use registry::{DashboardStats, StaffRegistry};

/// Staff routes. All of them expect the auth middleware in front.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/staff",
            get(handlers::list_staff).post(handlers::create_staff),
        )
        .route("/api/staff/search", get(handlers::search_staff))
        .route("/api/staff/export", get(handlers::export_staff))
        .route(
            "/api/staff/{id}",
            get(handlers::get_staff)
                .put(handlers::update_staff)
                .delete(handlers::delete_staff),
        )
        .route(
            "/api/staff/{id}/update-with-file",
            put(handlers::update_staff),
        )
        .route("/api/staff/{id}/upload-id", post(handlers::upload_id))
        .route("/api/staff/{id}/download-id", get(handlers::download_id))
        .route("/api/dashboard", get(handlers::dashboard))
}
