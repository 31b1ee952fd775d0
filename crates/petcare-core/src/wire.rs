//! Backend payload normalization.
//!
//! The REST backend is inconsistent about field names (`id` vs `customerId`,
//! `requestedDateTime` vs `appointmentDate`, ...) and about list shapes
//! (`{items, totalCount}` vs a bare array). Everything is mapped to the
//! canonical models here, once; nothing past this module looks at raw
//! backend field names.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::clinic_time::{self, TimeError};
use crate::models::{
    Booking, BookingStatus, Branch, Customer, DoctorChoice, Employee, Invoice, InvoiceLine,
    InvoiceStatus, LineItemRef, MembershipTier, NewBooking, Pet, Position, StatusLabel,
};

/// Payload mapping errors.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("Invalid field {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

pub type WireResult<T> = Result<T, WireError>;

/// A list response in either of the shapes the backend uses.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Paged {
        items: Vec<T>,
        #[serde(rename = "totalCount", alias = "total", default)]
        total_count: Option<u64>,
    },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    /// Items and the unpaged total. A bare array's total is its length.
    pub fn into_parts(self) -> (Vec<T>, u64) {
        match self {
            ListEnvelope::Paged { items, total_count } => {
                let total = total_count.unwrap_or(items.len() as u64);
                (items, total)
            }
            ListEnvelope::Bare(items) => {
                let total = items.len() as u64;
                (items, total)
            }
        }
    }
}

/// Parse a list response body.
pub fn parse_list<T: for<'de> Deserialize<'de>>(json: &str) -> WireResult<(Vec<T>, u64)> {
    let envelope: ListEnvelope<T> = serde_json::from_str(json)?;
    Ok(envelope.into_parts())
}

/// Booking as the backend sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendBooking {
    #[serde(alias = "bookingId")]
    pub id: i64,
    #[serde(alias = "customer_id")]
    pub customer_id: i64,
    #[serde(alias = "pet_id")]
    pub pet_id: i64,
    #[serde(alias = "branch_id")]
    pub branch_id: i64,
    #[serde(alias = "employeeId", alias = "doctor_id", default, deserialize_with = "doctor_field")]
    pub doctor_id: Option<i64>,
    #[serde(alias = "serviceName", alias = "booking_type", default)]
    pub booking_type: String,
    #[serde(alias = "appointmentDate", alias = "bookingDate")]
    pub requested_date_time: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl BackendBooking {
    pub fn into_booking(self) -> WireResult<Booking> {
        let status = match self.status.as_deref() {
            None | Some("") => BookingStatus::Pending,
            Some(raw) => BookingStatus::parse_label(raw).ok_or_else(|| WireError::InvalidField {
                field: "status",
                value: raw.to_string(),
            })?,
        };
        let now = Utc::now().to_rfc3339();
        Ok(Booking {
            id: self.id,
            customer_id: self.customer_id,
            pet_id: self.pet_id,
            branch_id: self.branch_id,
            doctor_id: self.doctor_id,
            booking_type: self.booking_type,
            requested_at: clinic_time::parse_timestamp(&self.requested_date_time)?,
            status,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            version: 1,
            created_at: self.created_at.unwrap_or_else(|| now.clone()),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}

/// Doctor ids arrive as numbers, numeric strings, `"auto"` or null.
fn doctor_field<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid doctor id {}", n))),
        serde_json::Value::String(s) => DoctorChoice::parse(&s)
            .map(|choice| choice.doctor_id())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid doctor id '{}'", s))),
        other => Err(serde::de::Error::custom(format!("invalid doctor id {}", other))),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCustomer {
    #[serde(alias = "customerId")]
    pub id: i64,
    #[serde(alias = "name", alias = "customerName")]
    pub full_name: String,
    #[serde(alias = "phoneNumber", default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(alias = "membershipLevel", alias = "tier", default)]
    pub membership_tier: Option<String>,
    #[serde(alias = "loyaltyPoints", default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub member_since: Option<String>,
}

impl From<BackendCustomer> for Customer {
    fn from(c: BackendCustomer) -> Self {
        Customer {
            id: c.id,
            full_name: c.full_name,
            phone: c.phone,
            email: c.email,
            membership_tier: MembershipTier::parse(c.membership_tier.as_deref().unwrap_or("")),
            points: c.points.unwrap_or(0),
            member_since: c.member_since,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPet {
    #[serde(alias = "petId")]
    pub id: i64,
    #[serde(alias = "customer_id", alias = "ownerId")]
    pub customer_id: i64,
    #[serde(alias = "petName")]
    pub name: String,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(alias = "dateOfBirth", default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(alias = "healthStatus", default)]
    pub status: Option<String>,
}

impl From<BackendPet> for Pet {
    fn from(p: BackendPet) -> Self {
        Pet {
            id: p.id,
            customer_id: p.customer_id,
            name: p.name,
            species: p.species.unwrap_or_default(),
            breed: p.breed,
            birth_date: p.birth_date,
            gender: p.gender,
            status: p.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendEmployee {
    #[serde(alias = "employeeId")]
    pub id: i64,
    #[serde(alias = "branch_id")]
    pub branch_id: i64,
    #[serde(alias = "name", alias = "employeeName")]
    pub full_name: String,
    #[serde(default)]
    pub position_id: Option<i64>,
    #[serde(alias = "positionName", default)]
    pub position: Option<String>,
    #[serde(alias = "employeeCode", default)]
    pub code: Option<String>,
}

impl BackendEmployee {
    /// `positionId` wins over a position name.
    pub fn position(&self) -> Position {
        self.position_id
            .map(Position::from_position_id)
            .or_else(|| self.position.as_deref().and_then(Position::parse))
            .unwrap_or(Position::Other)
    }
}

impl From<BackendEmployee> for Employee {
    fn from(e: BackendEmployee) -> Self {
        let position = e.position();
        Employee {
            id: e.id,
            branch_id: e.branch_id,
            full_name: e.full_name,
            position,
            code: e.code,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendBranch {
    #[serde(alias = "branchId")]
    pub id: i64,
    #[serde(alias = "branchName")]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(alias = "phoneNumber", default)]
    pub phone: Option<String>,
}

impl From<BackendBranch> for Branch {
    fn from(b: BackendBranch) -> Self {
        Branch {
            id: b.id,
            name: b.name,
            address: b.address,
            phone: b.phone,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInvoiceLine {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub service_id: Option<i64>,
    #[serde(alias = "name", alias = "productName", alias = "serviceName", default)]
    pub description: String,
    pub quantity: f64,
    #[serde(alias = "price")]
    pub unit_price: f64,
    #[serde(alias = "lineTotal", default)]
    pub total: Option<f64>,
}

impl BackendInvoiceLine {
    pub fn into_line(self) -> WireResult<InvoiceLine> {
        let item = match (self.product_id, self.service_id) {
            (Some(id), None) => LineItemRef::Product(id),
            (None, Some(id)) => LineItemRef::Service(id),
            _ => {
                return Err(WireError::InvalidField {
                    field: "productId/serviceId",
                    value: self.description,
                })
            }
        };
        let mut line = InvoiceLine::new(item, self.description, self.quantity, self.unit_price);
        if let Some(total) = self.total {
            line.total = total;
        }
        Ok(line)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendInvoice {
    #[serde(alias = "invoiceId")]
    pub id: i64,
    pub customer_id: i64,
    pub branch_id: i64,
    #[serde(alias = "createdDate")]
    pub invoice_date: String,
    pub total_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub final_amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(alias = "invoiceDetails", alias = "details", default)]
    pub items: Vec<BackendInvoiceLine>,
}

impl BackendInvoice {
    pub fn into_invoice(self) -> WireResult<Invoice> {
        let status = match self.status.as_deref() {
            None | Some("") => InvoiceStatus::Pending,
            Some(raw) => InvoiceStatus::parse_label(raw).ok_or_else(|| WireError::InvalidField {
                field: "status",
                value: raw.to_string(),
            })?,
        };
        // Dates may carry a time part
        let invoice_date = self
            .invoice_date
            .get(..10)
            .unwrap_or(&self.invoice_date)
            .to_string();
        clinic_time::parse_date(&invoice_date)?;

        Ok(Invoice {
            id: self.id,
            customer_id: self.customer_id,
            branch_id: self.branch_id,
            invoice_date,
            total_amount: self.total_amount,
            discount_amount: self.discount_amount,
            final_amount: self.final_amount,
            status,
            lines: self
                .items
                .into_iter()
                .map(BackendInvoiceLine::into_line)
                .collect::<WireResult<Vec<_>>>()?,
            version: 1,
        })
    }
}

/// Outbound `POST /bookings` body.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequestBody {
    pub customer_id: i64,
    pub pet_id: i64,
    pub branch_id: i64,
    /// Serialized as `null` for "auto"
    pub doctor_id: Option<i64>,
    pub booking_type: String,
    /// RFC 3339 with the clinic offset
    pub requested_date_time: String,
    pub status: &'static str,
    pub notes: Option<String>,
}

impl BookingRequestBody {
    pub fn from_new_booking(request: &NewBooking) -> WireResult<Self> {
        let doctor = DoctorChoice::parse(&request.doctor).ok_or_else(|| WireError::InvalidField {
            field: "doctorId",
            value: request.doctor.clone(),
        })?;
        let requested_at = clinic_time::parse_timestamp(&request.requested_at)?;
        Ok(Self {
            customer_id: request.customer_id,
            pet_id: request.pet_id,
            branch_id: request.branch_id,
            doctor_id: doctor.doctor_id(),
            booking_type: request.booking_type.trim().to_string(),
            requested_date_time: requested_at
                .with_timezone(&clinic_time::clinic_offset())
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, false),
            status: BookingStatus::Pending.as_str(),
            notes: request.notes.clone().filter(|n| !n.trim().is_empty()),
        })
    }

    pub fn to_json(&self) -> WireResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
