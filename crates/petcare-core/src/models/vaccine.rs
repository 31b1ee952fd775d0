//! Vaccination history models.

use serde::{Deserialize, Serialize};

/// One administered dose. Records are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaccineRecord {
    pub id: i64,
    pub pet_id: i64,
    pub vaccine_id: i64,
    pub branch_id: i64,
    pub doctor_id: i64,
    /// Dose number or amount as written by the vet
    pub dose: String,
    /// `YYYY-MM-DD`
    pub date_administered: String,
    /// `YYYY-MM-DD`
    pub next_due_date: Option<String>,
    pub created_at: String,
}

/// Vaccination entry as submitted from the vet screen.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVaccineRecord {
    pub pet_id: i64,
    pub vaccine_id: i64,
    pub doctor_id: i64,
    pub dose: String,
    pub date_administered: String,
    pub next_due_date: Option<String>,
}
