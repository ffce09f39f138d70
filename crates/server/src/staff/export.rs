//! Flat roster rows for spreadsheet rendering.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::fields::DATE_FORMAT;
use super::models::StaffRecord;

pub const EXPORT_COLUMNS: [&str; 12] = [
    "First Name",
    "Last Name",
    "National Insurance Number",
    "Home Address",
    "Telephone Number",
    "Employment Status",
    "Immigration Status",
    "Visa Type",
    "Visa Sharecode",
    "Sex",
    "Date of Birth",
    "Proof of ID",
];

/// What the "Proof of ID" column carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// The stored reference itself.
    #[default]
    Raw,
    /// `Uploaded` or `Pending`.
    Status,
}

impl FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(ExportMode::Raw),
            "status" => Ok(ExportMode::Status),
            other => Err(format!("Unknown export mode: {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow(pub [String; 12]);

impl ExportRow {
    pub fn project(record: &StaffRecord, mode: ExportMode) -> Self {
        let f = &record.fields;
        let proof = match mode {
            ExportMode::Raw => record.proof_of_id.clone(),
            ExportMode::Status if record.has_document() => "Uploaded".to_string(),
            ExportMode::Status => "Pending".to_string(),
        };

        ExportRow([
            f.firstname.clone(),
            f.lastname.clone(),
            f.national_insurance_number.clone(),
            f.home_address.clone(),
            f.telephone_number.clone(),
            f.employment_status.to_string(),
            f.immigration_status.clone(),
            f.visa_type.clone(),
            f.visa_sharecode.clone(),
            f.sex.to_string(),
            f.date_of_birth.format(DATE_FORMAT).to_string(),
            proof,
        ])
    }

    pub fn cells(&self) -> &[String; 12] {
        &self.0
    }
}

/// Header plus rows, as the renderer consumes them.
#[derive(Debug, Clone, Serialize)]
pub struct RosterExport {
    pub columns: [&'static str; 12],
    pub rows: Vec<ExportRow>,
}

impl RosterExport {
    pub fn new(rows: Vec<ExportRow>) -> Self {
        Self {
            columns: EXPORT_COLUMNS,
            rows,
        }
    }
}
