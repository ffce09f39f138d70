//! Staff handlers

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info};

use super::export::{ExportMode, RosterExport};
use super::fields::FieldInput;
use super::models::{EmploymentStatus, StaffRecord, Upload};
use super::registry::DashboardStats;
use crate::core::config::AppState;
use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};

/// Multipart field carrying the proof-of-ID file.
pub const DOCUMENT_FIELD: &str = "proof_of_id";

/// Staff form body: JSON object or multipart with an optional file.
#[derive(Debug, Default)]
pub struct StaffForm {
    pub fields: FieldInput,
    pub upload: Option<Upload>,
}

impl<S> FromRequest<S> for StaffForm
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| Error::invalid(e.body_text()))?;
            read_multipart(multipart).await
        } else {
            let Json(body) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| Error::invalid(e.body_text()))?;
            read_json(body)
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<StaffForm> {
    let mut form = StaffForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {}", e);
        Error::invalid(e.body_text())
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == DOCUMENT_FIELD && field.file_name().is_some() {
            let filename = field.file_name().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::invalid(e.body_text()))?;
            if !filename.is_empty() {
                form.upload = Some(Upload { filename, data });
            }
        } else if !name.is_empty() {
            let value = field
                .text()
                .await
                .map_err(|e| Error::invalid(e.body_text()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn read_json(body: Map<String, Value>) -> Result<StaffForm> {
    let mut form = StaffForm::default();
    let mut reasons = Vec::new();

    for (key, value) in body {
        match value {
            Value::Null => {}
            Value::String(s) => {
                form.fields.insert(key, s);
            }
            Value::Number(n) => {
                form.fields.insert(key, n.to_string());
            }
            Value::Bool(b) => {
                form.fields.insert(key, b.to_string());
            }
            Value::Array(_) | Value::Object(_) => {
                reasons.push(format!("{} must be a string", key));
            }
        }
    }

    if reasons.is_empty() {
        Ok(form)
    } else {
        Err(Error::Validation(reasons))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub employment_status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub mode: Option<String>,
}

/// GET /api/staff
pub async fn list_staff(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Json<Vec<StaffRecord>>> {
    info!("GET /api/staff");
    let staff = state.staff.list_by_tenant(ctx.boss_id()).await?;
    Ok(Json(staff))
}

/// POST /api/staff
pub async fn create_staff(
    State(state): State<AppState>,
    ctx: Ctx,
    form: StaffForm,
) -> Result<(StatusCode, Json<Value>)> {
    info!("POST /api/staff");

    let staff = state
        .staff
        .create(ctx.boss_id(), &form.fields, form.upload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Staff added successfully",
            "staff": staff,
        })),
    ))
}

/// GET /api/staff/search
pub async fn search_staff(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<StaffRecord>>> {
    info!("GET /api/staff/search");

    let raw_status = params.employment_status.as_deref().map(str::trim);
    let status: Option<EmploymentStatus> = match raw_status {
        None | Some("") => None,
        Some(raw) => Some(raw.parse().map_err(Error::invalid)?),
    };

    let staff = state
        .staff
        .search(ctx.boss_id(), params.q.as_deref(), status)
        .await?;
    Ok(Json(staff))
}

/// GET /api/staff/export
pub async fn export_staff(
    State(state): State<AppState>,
    ctx: Ctx,
    Query(params): Query<ExportParams>,
) -> Result<Json<RosterExport>> {
    info!("GET /api/staff/export");

    let mode: ExportMode = match params.mode.as_deref() {
        None | Some("") => ExportMode::default(),
        Some(raw) => raw.parse().map_err(Error::invalid)?,
    };

    let rows = state.staff.export_rows(ctx.boss_id(), mode).await?;
    Ok(Json(RosterExport::new(rows)))
}

/// GET /api/staff/{id}
pub async fn get_staff(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(staff_id): Path<i64>,
) -> Result<Json<StaffRecord>> {
    info!("GET /api/staff/{}", staff_id);
    let staff = state.staff.get(staff_id, ctx.boss_id()).await?;
    Ok(Json(staff))
}

/// PUT /api/staff/{id} and PUT /api/staff/{id}/update-with-file
pub async fn update_staff(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(staff_id): Path<i64>,
    form: StaffForm,
) -> Result<Json<Value>> {
    info!("PUT /api/staff/{}", staff_id);

    let staff = state
        .staff
        .update(staff_id, ctx.boss_id(), &form.fields, form.upload)
        .await?;

    Ok(Json(json!({
        "message": "Staff updated successfully",
        "staff": staff,
    })))
}

/// DELETE /api/staff/{id}
pub async fn delete_staff(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(staff_id): Path<i64>,
) -> Result<Json<Value>> {
    info!("DELETE /api/staff/{}", staff_id);
    state.staff.delete(staff_id, ctx.boss_id()).await?;
    Ok(Json(json!({ "message": "Staff deleted successfully" })))
}

/// POST /api/staff/{id}/upload-id
pub async fn upload_id(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(staff_id): Path<i64>,
    form: StaffForm,
) -> Result<Json<Value>> {
    info!("POST /api/staff/{}/upload-id", staff_id);

    let upload = form.upload.ok_or_else(|| Error::invalid("No file provided"))?;
    let staff = state
        .staff
        .attach_document(staff_id, ctx.boss_id(), upload)
        .await?;

    Ok(Json(json!({
        "message": "Proof of ID uploaded successfully",
        "staff": staff,
    })))
}

/// GET /api/staff/{id}/download-id
pub async fn download_id(
    State(state): State<AppState>,
    ctx: Ctx,
    Path(staff_id): Path<i64>,
) -> Result<(HeaderMap, axum::body::Bytes)> {
    info!("GET /api/staff/{}/download-id", staff_id);

    let (filename, document) = state.staff.document(staff_id, ctx.boss_id()).await?;

    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&document.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok((headers, document.data))
}

/// GET /api/dashboard
pub async fn dashboard(State(state): State<AppState>, ctx: Ctx) -> Result<Json<DashboardStats>> {
    info!("GET /api/dashboard");
    let stats = state.staff.statistics(ctx.boss_id()).await?;
    Ok(Json(stats))
}
