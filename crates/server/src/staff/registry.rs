//! Staff registry: tenant-scoped CRUD, search, export and statistics.
//!
//! Row changes run in one transaction each. Document I/O happens outside
//! of it so no SQLite lock is held across a slow remote call.

use chrono::Utc;
use doc_store::{document_extension, DocumentStore, ResolvedDocument};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::export::{ExportMode, ExportRow};
use super::fields::FieldInput;
use super::models::{EmploymentStatus, StaffFields, StaffRecord, Upload};
use crate::core::db;
use crate::core::error::{Error, Result};

const ROSTER_ORDER: &str = "ORDER BY firstname COLLATE NOCASE, lastname COLLATE NOCASE, id";

/// Tries at recording a replaced document's reference on its row.
const REFERENCE_ATTEMPTS: u32 = 3;

/// Number of records listed under "recent" on the dashboard.
pub const RECENT_STAFF_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_staff: usize,
    pub employment_status_breakdown: BTreeMap<String, usize>,
    pub immigration_status_breakdown: BTreeMap<String, usize>,
    pub gender_breakdown: BTreeMap<String, usize>,
    pub recent_staff: Vec<StaffRecord>,
}

pub struct StaffRegistry {
    pool: SqlitePool,
    documents: Arc<dyn DocumentStore>,
}

impl StaffRegistry {
    pub fn new(pool: SqlitePool, documents: Arc<dyn DocumentStore>) -> Self {
        Self { pool, documents }
    }

    /// Create a record, then attach `document` if one was supplied.
    ///
    /// The row is committed first so the document key can use its id. If
    /// the document cannot be stored the row is removed again; should that
    /// also fail the row stays behind as `pending`.
    pub async fn create(
        &self,
        boss_id: i64,
        input: &FieldInput,
        document: Option<Upload>,
    ) -> Result<StaffRecord> {
        let fields = StaffFields::from_input(input)?;
        if let Some(upload) = &document {
            document_extension(&upload.filename)?;
        }

        let mut tx = self.pool.begin_with(db::BEGIN_WRITE).await?;
        ensure_ni_free(&mut tx, &fields.national_insurance_number, None).await?;

        let record: StaffRecord = sqlx::query_as(
            r#"
            INSERT INTO staff (
                boss_id, firstname, lastname, national_insurance_number, home_address,
                telephone_number, employment_status, immigration_status, visa_type,
                visa_sharecode, sex, date_of_birth, proof_of_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(boss_id)
        .bind(&fields.firstname)
        .bind(&fields.lastname)
        .bind(&fields.national_insurance_number)
        .bind(&fields.home_address)
        .bind(&fields.telephone_number)
        .bind(fields.employment_status)
        .bind(&fields.immigration_status)
        .bind(&fields.visa_type)
        .bind(&fields.visa_sharecode)
        .bind(fields.sex)
        .bind(fields.date_of_birth)
        .bind(doc_store::PENDING)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            "[Staff] Boss {} created staff {} ({} {})",
            boss_id, record.id, record.fields.firstname, record.fields.lastname
        );

        let Some(upload) = document else {
            return Ok(record);
        };

        let reference = match self
            .documents
            .put(boss_id, record.id, upload.data, &upload.filename)
            .await
        {
            Ok(reference) => reference,
            Err(e) => {
                warn!("[Staff] Document for new staff {} failed: {}", record.id, e);
                self.discard_row(record.id).await;
                return Err(e.into());
            }
        };

        match self.set_reference(record.id, &reference).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Err(cleanup) = self.documents.delete(&reference).await {
                    warn!("[Staff] Leaked document {}: {}", reference, cleanup);
                }
                self.discard_row(record.id).await;
                Err(e)
            }
        }
    }

    /// Apply a partial update; a supplied document replaces the current one.
    pub async fn update(
        &self,
        staff_id: i64,
        boss_id: i64,
        patch: &FieldInput,
        document: Option<Upload>,
    ) -> Result<StaffRecord> {
        if let Some(upload) = &document {
            document_extension(&upload.filename)?;
        }

        let mut tx = self.pool.begin_with(db::BEGIN_WRITE).await?;
        let current = fetch_scoped(&mut tx, staff_id, boss_id).await?;
        let fields = current.fields.patched(patch)?;

        if fields.national_insurance_number != current.fields.national_insurance_number {
            ensure_ni_free(&mut tx, &fields.national_insurance_number, Some(staff_id)).await?;
        }

        let record: StaffRecord = sqlx::query_as(
            r#"
            UPDATE staff SET
                firstname = ?, lastname = ?, national_insurance_number = ?, home_address = ?,
                telephone_number = ?, employment_status = ?, immigration_status = ?,
                visa_type = ?, visa_sharecode = ?, sex = ?, date_of_birth = ?, updated_at = ?
            WHERE id = ? AND boss_id = ?
            RETURNING *
            "#,
        )
        .bind(&fields.firstname)
        .bind(&fields.lastname)
        .bind(&fields.national_insurance_number)
        .bind(&fields.home_address)
        .bind(&fields.telephone_number)
        .bind(fields.employment_status)
        .bind(&fields.immigration_status)
        .bind(&fields.visa_type)
        .bind(&fields.visa_sharecode)
        .bind(fields.sex)
        .bind(fields.date_of_birth)
        .bind(Utc::now())
        .bind(staff_id)
        .bind(boss_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("[Staff] Boss {} updated staff {}", boss_id, staff_id);

        match document {
            Some(upload) => self.swap_document(record, upload).await,
            None => Ok(record),
        }
    }

    /// Upload or replace the proof of ID of an existing record.
    pub async fn attach_document(
        &self,
        staff_id: i64,
        boss_id: i64,
        upload: Upload,
    ) -> Result<StaffRecord> {
        document_extension(&upload.filename)?;
        let record = self.get(staff_id, boss_id).await?;
        self.swap_document(record, upload).await
    }

    /// Release the document, then remove the row.
    ///
    /// A document failure leaves the record untouched. A row failure after
    /// the release leaves a stale reference, which resolves as `NotFound`.
    pub async fn delete(&self, staff_id: i64, boss_id: i64) -> Result<()> {
        let record = self.get(staff_id, boss_id).await?;

        self.documents.delete(&record.proof_of_id).await?;

        let mut tx = self.pool.begin_with(db::BEGIN_WRITE).await?;
        let result = sqlx::query("DELETE FROM staff WHERE id = ? AND boss_id = ?")
            .bind(staff_id)
            .bind(boss_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        tx.commit().await?;

        info!("[Staff] Boss {} deleted staff {}", boss_id, staff_id);
        Ok(())
    }

    pub async fn get(&self, staff_id: i64, boss_id: i64) -> Result<StaffRecord> {
        sqlx::query_as("SELECT * FROM staff WHERE id = ? AND boss_id = ?")
            .bind(staff_id)
            .bind(boss_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound)
    }

    pub async fn list_by_tenant(&self, boss_id: i64) -> Result<Vec<StaffRecord>> {
        let sql = format!("SELECT * FROM staff WHERE boss_id = ? {}", ROSTER_ORDER);
        Ok(sqlx::query_as(&sql)
            .bind(boss_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Case-insensitive substring match over first name, last name, phone
    /// and NI number, narrowed by an exact status when given.
    pub async fn search(
        &self,
        boss_id: i64,
        query: Option<&str>,
        status: Option<EmploymentStatus>,
    ) -> Result<Vec<StaffRecord>> {
        let records: Vec<StaffRecord> = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT * FROM staff WHERE boss_id = ? AND employment_status = ? {}",
                    ROSTER_ORDER
                );
                sqlx::query_as(&sql)
                    .bind(boss_id)
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => self.list_by_tenant(boss_id).await?,
        };

        let needle = query.map(str::trim).unwrap_or_default().to_lowercase();
        if needle.is_empty() {
            return Ok(records);
        }

        // SQLite's LIKE folds ASCII only, so matching happens here.
        Ok(records
            .into_iter()
            .filter(|r| {
                let f = &r.fields;
                [
                    &f.firstname,
                    &f.lastname,
                    &f.telephone_number,
                    &f.national_insurance_number,
                ]
                .iter()
                .any(|value| value.to_lowercase().contains(&needle))
            })
            .collect())
    }

    pub async fn export_rows(&self, boss_id: i64, mode: ExportMode) -> Result<Vec<ExportRow>> {
        let records = self.list_by_tenant(boss_id).await?;
        Ok(records
            .iter()
            .map(|record| ExportRow::project(record, mode))
            .collect())
    }

    /// Resolve the proof of ID. Returns the download filename with the bytes.
    pub async fn document(
        &self,
        staff_id: i64,
        boss_id: i64,
    ) -> Result<(String, ResolvedDocument)> {
        let record = self.get(staff_id, boss_id).await?;
        if !record.has_document() {
            return Err(Error::NotFound);
        }

        let resolved = self.documents.resolve(&record.proof_of_id).await?;
        let filename = record
            .proof_of_id
            .rsplit('/')
            .next()
            .unwrap_or(&record.proof_of_id)
            .to_string();
        Ok((filename, resolved))
    }

    pub async fn statistics(&self, boss_id: i64) -> Result<DashboardStats> {
        let records = self.list_by_tenant(boss_id).await?;

        let mut employment: BTreeMap<String, usize> = BTreeMap::new();
        let mut immigration: BTreeMap<String, usize> = BTreeMap::new();
        let mut gender: BTreeMap<String, usize> = BTreeMap::new();
        for record in &records {
            let f = &record.fields;
            *employment.entry(f.employment_status.to_string()).or_default() += 1;
            *immigration.entry(f.immigration_status.clone()).or_default() += 1;
            *gender.entry(f.sex.to_string()).or_default() += 1;
        }

        let total_staff = records.len();
        let mut recent_staff = records;
        recent_staff.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recent_staff.truncate(RECENT_STAFF_LIMIT);

        Ok(DashboardStats {
            total_staff,
            employment_status_breakdown: employment,
            immigration_status_breakdown: immigration,
            gender_breakdown: gender,
            recent_staff,
        })
    }

    async fn swap_document(&self, record: StaffRecord, upload: Upload) -> Result<StaffRecord> {
        let reference = self
            .documents
            .replace(
                &record.proof_of_id,
                record.boss_id,
                record.id,
                upload.data,
                &upload.filename,
            )
            .await?;

        if reference == record.proof_of_id {
            return Ok(record);
        }

        // The old artifact is gone now, so the new one must not be dropped
        // while the row still exists.
        let mut attempt = 1;
        loop {
            match self.set_reference(record.id, &reference).await {
                Ok(updated) => return Ok(updated),
                Err(Error::NotFound) => {
                    if let Err(e) = self.documents.delete(&reference).await {
                        warn!("[Staff] Leaked document {}: {}", reference, e);
                    }
                    return Err(Error::NotFound);
                }
                Err(e) if attempt < REFERENCE_ATTEMPTS => {
                    warn!(
                        "[Staff] Recording document for staff {} failed (attempt {}): {}",
                        record.id, attempt, e
                    );
                    tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "[Staff] Staff {} still references released {}; stored document is {}: {}",
                        record.id, record.proof_of_id, reference, e
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn set_reference(&self, staff_id: i64, reference: &str) -> Result<StaffRecord> {
        Ok(
            sqlx::query_as("UPDATE staff SET proof_of_id = ? WHERE id = ? RETURNING *")
                .bind(reference)
                .bind(staff_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }

    /// Undo a create whose document step failed.
    async fn discard_row(&self, staff_id: i64) {
        let removed = sqlx::query("DELETE FROM staff WHERE id = ?")
            .bind(staff_id)
            .execute(&self.pool)
            .await;
        if let Err(e) = removed {
            warn!(
                "[Staff] Staff {} left pending after failed upload: {}",
                staff_id, e
            );
        }
    }
}

async fn fetch_scoped(
    tx: &mut sqlx::SqliteConnection,
    staff_id: i64,
    boss_id: i64,
) -> Result<StaffRecord> {
    sqlx::query_as("SELECT * FROM staff WHERE id = ? AND boss_id = ?")
        .bind(staff_id)
        .bind(boss_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound)
}

/// NI numbers are unique across every tenant, not just the caller's.
async fn ensure_ni_free(
    tx: &mut sqlx::SqliteConnection,
    ni: &str,
    except: Option<i64>,
) -> Result<()> {
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM staff WHERE national_insurance_number = ?")
            .bind(ni)
            .fetch_optional(&mut *tx)
            .await?;

    match existing {
        Some((id,)) if Some(id) != except => Err(Error::DuplicateIdentifier(
            "National Insurance Number already exists".into(),
        )),
        _ => Ok(()),
    }
}
