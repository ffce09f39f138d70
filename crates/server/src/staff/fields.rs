//! Allow-listed staff field table.
//!
//! Every writable field has one entry: a name and a typed setter that
//! validates the trimmed input. Keys outside the table are rejected, except
//! the immutable ones which are dropped.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::models::{EmploymentStatus, Sex, StaffFields};
use crate::core::error::{Error, Result};

/// Raw field input as submitted by a form or JSON body.
pub type FieldInput = BTreeMap<String, String>;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Keys that name stored but non-writable columns.
pub const IMMUTABLE_FIELDS: &[&str] = &[
    "id",
    "boss_id",
    "tenant_id",
    "created_at",
    "updated_at",
    "proof_of_id",
];

enum FieldError {
    Invalid(String),
    BadDate,
}

type Setter = fn(&mut StaffFields, &str) -> std::result::Result<(), FieldError>;

struct FieldRule {
    name: &'static str,
    set: Setter,
}

const FIELDS: &[FieldRule] = &[
    FieldRule {
        name: "firstname",
        set: |f, v| {
            f.firstname = v.to_string();
            Ok(())
        },
    },
    FieldRule {
        name: "lastname",
        set: |f, v| {
            f.lastname = v.to_string();
            Ok(())
        },
    },
    FieldRule {
        name: "national_insurance_number",
        set: |f, v| {
            f.national_insurance_number = v.to_uppercase();
            Ok(())
        },
    },
    FieldRule {
        name: "home_address",
        set: |f, v| {
            f.home_address = v.to_string();
            Ok(())
        },
    },
    FieldRule {
        name: "telephone_number",
        set: |f, v| {
            f.telephone_number = v.to_string();
            Ok(())
        },
    },
    FieldRule {
        name: "employment_status",
        set: |f, v| {
            f.employment_status = v.parse().map_err(FieldError::Invalid)?;
            Ok(())
        },
    },
    FieldRule {
        name: "immigration_status",
        set: |f, v| {
            f.immigration_status = v.to_string();
            Ok(())
        },
    },
    FieldRule {
        name: "visa_type",
        set: |f, v| {
            f.visa_type = v.to_string();
            Ok(())
        },
    },
    FieldRule {
        name: "visa_sharecode",
        set: |f, v| {
            f.visa_sharecode = v.to_string();
            Ok(())
        },
    },
    FieldRule {
        name: "sex",
        set: |f, v| {
            f.sex = v.parse().map_err(FieldError::Invalid)?;
            Ok(())
        },
    },
    FieldRule {
        name: "date_of_birth",
        set: |f, v| {
            f.date_of_birth = parse_date(v).ok_or(FieldError::BadDate)?;
            Ok(())
        },
    },
];

/// Strict `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Collected failures for one input.
#[derive(Default)]
struct Failures {
    reasons: Vec<String>,
    bad_date: bool,
}

impl Failures {
    fn push(&mut self, err: FieldError) {
        match err {
            FieldError::Invalid(reason) => self.reasons.push(reason),
            FieldError::BadDate => self.bad_date = true,
        }
    }

    /// A lone date problem keeps its own kind; mixed with others it is
    /// listed alongside them.
    fn into_result(self) -> Result<()> {
        match (self.reasons.is_empty(), self.bad_date) {
            (true, false) => Ok(()),
            (true, true) => Err(Error::InvalidDateFormat),
            (false, bad_date) => {
                let mut reasons = self.reasons;
                if bad_date {
                    reasons.push(Error::InvalidDateFormat.to_string());
                }
                Err(Error::Validation(reasons))
            }
        }
    }
}

fn unknown_keys<'a>(input: &'a FieldInput) -> impl Iterator<Item = &'a String> + 'a {
    input.keys().filter(|key| {
        !IMMUTABLE_FIELDS.contains(&key.as_str()) && !FIELDS.iter().any(|rule| rule.name == *key)
    })
}

impl StaffFields {
    fn blank() -> Self {
        Self {
            firstname: String::new(),
            lastname: String::new(),
            national_insurance_number: String::new(),
            home_address: String::new(),
            telephone_number: String::new(),
            employment_status: EmploymentStatus::FullTime,
            immigration_status: String::new(),
            visa_type: String::new(),
            visa_sharecode: String::new(),
            sex: Sex::Other,
            date_of_birth: NaiveDate::MIN,
        }
    }

    /// Build a complete field set. Every table field is required.
    pub fn from_input(input: &FieldInput) -> Result<Self> {
        let mut fields = Self::blank();
        let mut failures = Failures::default();

        for key in unknown_keys(input) {
            failures.reasons.push(format!("Unknown field: {}", key));
        }

        for rule in FIELDS {
            match input.get(rule.name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                Some(value) => {
                    if let Err(e) = (rule.set)(&mut fields, value) {
                        failures.push(e);
                    }
                }
                None => failures.reasons.push(format!("{} is required", rule.name)),
            }
        }

        failures.into_result()?;
        Ok(fields)
    }

    /// Apply a partial update on a copy of `self`.
    ///
    /// Blank values leave the field unchanged.
    pub fn patched(&self, input: &FieldInput) -> Result<Self> {
        let mut fields = self.clone();
        let mut failures = Failures::default();

        for key in unknown_keys(input) {
            failures.reasons.push(format!("Unknown field: {}", key));
        }

        for rule in FIELDS {
            let Some(value) = input.get(rule.name).map(|v| v.trim()) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            if let Err(e) = (rule.set)(&mut fields, value) {
                failures.push(e);
            }
        }

        failures.into_result()?;
        Ok(fields)
    }
}
