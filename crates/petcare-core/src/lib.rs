//! PetCare Core Library
//!
//! Booking lifecycle and availability core for a multi-branch pet-care clinic.
//!
//! # Architecture
//!
//! ```text
//!   Backend JSON ──▶ wire (normalize aliases) ──▶ import_* ──┐
//!                                                           ▼
//!   Client screens ──▶ PetCareCore (FFI) ──▶ BookingManager ──▶ Database (SQLite)
//!        │                                   InvoiceService
//!        └── SearchSession (debounce, stale-response guard)
//! ```
//!
//! # Core Principle
//!
//! **Every write is conditional on the version the caller read.** Two operators
//! editing the same booking get a `Conflict`, never a silent overwrite.
//!
//! # Modules
//!
//! - [`db`]: SQLite data store
//! - [`models`]: Domain types (Booking, Customer, Pet, Employee, Invoice, ...)
//! - [`booking`]: Booking lifecycle manager
//! - [`invoice`]: Invoice service
//! - [`search`]: Search-as-you-type controller
//! - [`wire`]: Backend payload normalization
//! - [`clinic_time`]: Clinic timezone handling
//! - [`config`]: TOML configuration

pub mod booking;
pub mod clinic_time;
pub mod config;
pub mod db;
pub mod invoice;
pub mod models;
pub mod search;
pub mod wire;

// Re-export commonly used types
pub use booking::{BookingError, BookingManager, BookingQuery};
pub use config::{ClinicConfig, ConfigError};
pub use db::Database;
pub use invoice::{InvoiceError, InvoiceService};
pub use models::{
    Booking, BookingEdit, BookingStatus, CustomerBookings, Employee, Invoice, InvoiceStatus,
    Language, NewBooking, NewVaccineRecord, Page, PageRequest, Role, ScheduleEntry,
    SessionContext, StatusLabel, VaccineRecord,
};
pub use search::{SearchController, SearchTicket};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PetCareError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Login required: {0}")]
    AuthRequired(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for PetCareError {
    fn from(e: db::DbError) -> Self {
        PetCareError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for PetCareError {
    fn from(e: serde_json::Error) -> Self {
        PetCareError::SerializationError(e.to_string())
    }
}

impl From<BookingError> for PetCareError {
    fn from(e: BookingError) -> Self {
        let message = e.user_message(Language::default());
        match e {
            BookingError::Validation(_) => PetCareError::InvalidInput(message),
            BookingError::NotFound(_) => PetCareError::NotFound(message),
            BookingError::InvalidTransition { .. } => PetCareError::InvalidTransition(message),
            BookingError::Conflict { .. } => PetCareError::Conflict(message),
            BookingError::Unavailable { .. } => PetCareError::Unavailable(message),
            BookingError::Forbidden(_) => PetCareError::Forbidden(message),
            BookingError::AuthRequired(inner) => PetCareError::AuthRequired(inner.0),
            BookingError::Storage(inner) => PetCareError::DatabaseError(inner.to_string()),
        }
    }
}

impl From<InvoiceError> for PetCareError {
    fn from(e: InvoiceError) -> Self {
        match e {
            InvoiceError::Validation(msg) => PetCareError::InvalidInput(msg),
            InvoiceError::NotFound(what) => PetCareError::NotFound(what),
            e @ InvoiceError::InvalidTransition { .. } => PetCareError::InvalidTransition(e.to_string()),
            e @ InvoiceError::Conflict { .. } => PetCareError::Conflict(e.to_string()),
            InvoiceError::Forbidden(msg) => PetCareError::Forbidden(msg),
            InvoiceError::Storage(inner) => PetCareError::DatabaseError(inner.to_string()),
        }
    }
}

impl From<models::AuthRequired> for PetCareError {
    fn from(e: models::AuthRequired) -> Self {
        PetCareError::AuthRequired(e.0)
    }
}

impl From<wire::WireError> for PetCareError {
    fn from(e: wire::WireError) -> Self {
        match e {
            wire::WireError::Json(inner) => PetCareError::SerializationError(inner.to_string()),
            other => PetCareError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ConfigError> for PetCareError {
    fn from(e: ConfigError) -> Self {
        PetCareError::ConfigError(e.to_string())
    }
}

impl From<clinic_time::TimeError> for PetCareError {
    fn from(e: clinic_time::TimeError) -> Self {
        PetCareError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PetCareError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PetCareError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path, with default settings.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<PetCareCore>, PetCareError> {
    let db = Database::open(&path)?;
    Ok(PetCareCore::wrap(db, ClinicConfig::default()))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<PetCareCore>, PetCareError> {
    let db = Database::open_in_memory()?;
    Ok(PetCareCore::wrap(db, ClinicConfig::default()))
}

/// Open the database described by a TOML configuration document.
#[uniffi::export]
pub fn open_with_config(config_toml: String) -> Result<Arc<PetCareCore>, PetCareError> {
    let config = ClinicConfig::from_toml(&config_toml)?;
    let db = match &config.database_path {
        Some(path) => Database::open(path)?,
        None => Database::open_in_memory()?,
    };
    tracing::info!(database = ?config.database_path, "Opened clinic store");
    Ok(PetCareCore::wrap(db, config))
}

/// Install the log subscriber. `filter` overrides `RUST_LOG`; repeated calls are no-ops.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) {
    use tracing_subscriber::EnvFilter;

    let env_filter = filter
        .and_then(|f| EnvFilter::try_new(f).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    // Already installed by an earlier call or the host application
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// Build a session from the client's persisted login state (JSON).
#[uniffi::export]
pub fn session_from_stored(stored_json: String) -> Result<FfiSession, PetCareError> {
    let stored: models::StoredSession = serde_json::from_str(&stored_json)
        .map_err(|e| PetCareError::AuthRequired(e.to_string()))?;
    Ok(SessionContext::from_stored(&stored)?.into())
}

/// Display label of a booking status, given any known spelling.
#[uniffi::export]
pub fn booking_status_label(status: String, language: FfiLanguage) -> Result<String, PetCareError> {
    Ok(parse_booking_status(&status)?.label(language.into()).to_string())
}

/// Display label of an invoice status, given any known spelling.
#[uniffi::export]
pub fn invoice_status_label(status: String, language: FfiLanguage) -> Result<String, PetCareError> {
    Ok(parse_invoice_status(&status)?.label(language.into()).to_string())
}

/// The `POST /bookings` body for a booking form.
#[uniffi::export]
pub fn booking_request_body(request: FfiNewBooking) -> Result<String, PetCareError> {
    let body = wire::BookingRequestBody::from_new_booking(&request.into())?;
    Ok(body.to_json()?)
}

/// An imported booking must point at a known branch and at a pet of its customer.
fn check_booking_references(db: &Database, booking: &Booking) -> Result<(), PetCareError> {
    let pet = db.get_pet(booking.pet_id)?.ok_or_else(|| {
        PetCareError::InvalidInput(format!("booking {}: unknown pet {}", booking.id, booking.pet_id))
    })?;
    if !pet.is_owned_by(booking.customer_id) {
        return Err(PetCareError::InvalidInput(format!(
            "booking {}: pet {} does not belong to customer {}",
            booking.id, booking.pet_id, booking.customer_id
        )));
    }
    if db.get_branch(booking.branch_id)?.is_none() {
        return Err(PetCareError::InvalidInput(format!(
            "booking {}: unknown branch {}",
            booking.id, booking.branch_id
        )));
    }
    Ok(())
}

fn parse_booking_status(raw: &str) -> Result<BookingStatus, PetCareError> {
    BookingStatus::parse_label(raw)
        .ok_or_else(|| PetCareError::InvalidInput(format!("Unknown booking status: {}", raw)))
}

fn parse_invoice_status(raw: &str) -> Result<InvoiceStatus, PetCareError> {
    InvoiceStatus::parse_label(raw)
        .ok_or_else(|| PetCareError::InvalidInput(format!("Unknown invoice status: {}", raw)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe clinic store for FFI.
#[derive(uniffi::Object)]
pub struct PetCareCore {
    db: Arc<Mutex<Database>>,
    config: ClinicConfig,
}

impl PetCareCore {
    fn wrap(db: Database, config: ClinicConfig) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            config,
        })
    }

    /// Write every item in one transaction.
    fn import_all<T, F>(&self, what: &str, items: Vec<T>, write: F) -> Result<u32, PetCareError>
    where
        F: Fn(&Database, T) -> Result<(), PetCareError>,
    {
        let count = items.len();
        let db = self.db.lock()?;
        db.atomically(|| -> Result<(), PetCareError> {
            for item in items {
                write(&db, item)?;
            }
            Ok(())
        })
        .map_err(|e| {
            tracing::warn!(what, error = %e, "Import rolled back");
            e
        })?;
        tracing::info!(what, count, "Imported backend records");
        Ok(count as u32)
    }

    fn page_request(&self, page: u32, page_size: Option<u32>) -> PageRequest {
        let limits = &self.config.pagination;
        PageRequest::new(
            page,
            page_size.unwrap_or(limits.default_page_size),
            limits.max_page_size,
        )
    }
}

#[uniffi::export]
impl PetCareCore {
    // =========================================================================
    // Booking Operations
    // =========================================================================

    /// Create a booking. Always starts Pending.
    pub fn create_booking(&self, session: FfiSession, request: FfiNewBooking) -> Result<FfiBooking, PetCareError> {
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let booking = manager.create_booking(&session.try_into()?, &request.into())?;
        Ok(booking.into())
    }

    /// Change a booking's status. `status` accepts any known spelling.
    pub fn update_booking_status(
        &self,
        session: FfiSession,
        booking_id: i64,
        status: String,
        expected_version: Option<i64>,
    ) -> Result<FfiBooking, PetCareError> {
        let status = parse_booking_status(&status)?;
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let booking = manager.update_status(&session.try_into()?, booking_id, status, expected_version)?;
        Ok(booking.into())
    }

    /// Save an edited booking.
    pub fn edit_booking(
        &self,
        session: FfiSession,
        booking_id: i64,
        edit: FfiBookingEdit,
        expected_version: Option<i64>,
    ) -> Result<FfiBooking, PetCareError> {
        let edit = BookingEdit {
            doctor: edit.doctor,
            booking_type: edit.booking_type,
            requested_at: edit.requested_at,
            notes: edit.notes,
            status: edit.status.as_deref().map(parse_booking_status).transpose()?,
        };
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let booking = manager.edit_booking(&session.try_into()?, booking_id, &edit, expected_version)?;
        Ok(booking.into())
    }

    /// Check a customer in at the front desk.
    pub fn check_in(&self, session: FfiSession, booking_id: i64, employee_id: i64) -> Result<FfiBooking, PetCareError> {
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let booking = manager.check_in(&session.try_into()?, booking_id, employee_id)?;
        Ok(booking.into())
    }

    /// Record the visit's vaccination and complete the booking.
    pub fn complete_with_vaccination(
        &self,
        session: FfiSession,
        booking_id: i64,
        vaccination: FfiNewVaccineRecord,
    ) -> Result<FfiVisitCompletion, PetCareError> {
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let (booking, record) =
            manager.complete_with_vaccination(&session.try_into()?, booking_id, &vaccination.into())?;
        Ok(FfiVisitCompletion {
            booking: booking.into(),
            vaccination: record.into(),
        })
    }

    /// A doctor's appointments on a clinic day (`YYYY-MM-DD`).
    pub fn doctor_schedule(&self, doctor_id: i64, date: String) -> Result<Vec<FfiScheduleEntry>, PetCareError> {
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let entries = manager.doctor_schedule(doctor_id, &date)?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// Veterinarians of a branch who are free at `at`.
    pub fn available_doctors(&self, branch_id: i64, at: String) -> Result<Vec<FfiEmployee>, PetCareError> {
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let doctors = manager.available_doctors(branch_id, &at)?;
        Ok(doctors.into_iter().map(|d| d.into()).collect())
    }

    /// A customer's upcoming and past bookings, split at the current time.
    pub fn customer_bookings(
        &self,
        session: FfiSession,
        customer_id: Option<i64>,
    ) -> Result<FfiCustomerBookings, PetCareError> {
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let split = manager.customer_bookings(&session.try_into()?, customer_id, chrono::Utc::now())?;
        Ok(FfiCustomerBookings {
            upcoming: split.upcoming.into_iter().map(|b| b.into()).collect(),
            past: split.past.into_iter().map(|b| b.into()).collect(),
        })
    }

    /// One page of bookings for a staff list screen.
    pub fn list_bookings(
        &self,
        session: FfiSession,
        query: FfiBookingQuery,
        page: u32,
        page_size: Option<u32>,
    ) -> Result<FfiBookingPage, PetCareError> {
        let query = BookingQuery {
            branch_id: query.branch_id,
            status: query.status.as_deref().map(parse_booking_status).transpose()?,
            date: query.date,
            search: query.search,
        };
        let request = self.page_request(page, page_size);
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let result = manager.list_bookings(&session.try_into()?, &query, request)?;
        Ok(FfiBookingPage {
            total_pages: result.total_pages(),
            total_count: result.total_count,
            page: result.page,
            page_size: result.page_size,
            items: result.items.into_iter().map(|s| s.into()).collect(),
        })
    }

    // =========================================================================
    // Vaccination Operations
    // =========================================================================

    pub fn record_vaccination(
        &self,
        session: FfiSession,
        vaccination: FfiNewVaccineRecord,
    ) -> Result<FfiVaccineRecord, PetCareError> {
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let record = manager.record_vaccination(&session.try_into()?, &vaccination.into())?;
        Ok(record.into())
    }

    pub fn vaccine_history(&self, session: FfiSession, pet_id: i64) -> Result<Vec<FfiVaccineRecord>, PetCareError> {
        let db = self.db.lock()?;
        let manager = BookingManager::new(&db, self.config.booking.clone());
        let records = manager.vaccine_history(&session.try_into()?, pet_id)?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    // =========================================================================
    // Invoice Operations
    // =========================================================================

    pub fn create_invoice(&self, session: FfiSession, invoice: FfiInvoice) -> Result<FfiInvoice, PetCareError> {
        let invoice = Invoice::try_from(invoice)?;
        let db = self.db.lock()?;
        let created = InvoiceService::new(&db).create_invoice(&session.try_into()?, &invoice)?;
        Ok(created.into())
    }

    pub fn get_invoice(&self, session: FfiSession, invoice_id: i64) -> Result<FfiInvoice, PetCareError> {
        let db = self.db.lock()?;
        let invoice = InvoiceService::new(&db).get_invoice(&session.try_into()?, invoice_id)?;
        Ok(invoice.into())
    }

    pub fn list_invoices(
        &self,
        session: FfiSession,
        branch_id: i64,
        page: u32,
        page_size: Option<u32>,
    ) -> Result<FfiInvoicePage, PetCareError> {
        let request = self.page_request(page, page_size);
        let db = self.db.lock()?;
        let result = InvoiceService::new(&db).list_invoices(&session.try_into()?, branch_id, request)?;
        Ok(FfiInvoicePage {
            total_pages: result.total_pages(),
            total_count: result.total_count,
            page: result.page,
            page_size: result.page_size,
            items: result.items.into_iter().map(|i| i.into()).collect(),
        })
    }

    pub fn update_invoice_status(
        &self,
        session: FfiSession,
        invoice_id: i64,
        status: String,
        expected_version: Option<i64>,
    ) -> Result<FfiInvoice, PetCareError> {
        let status = parse_invoice_status(&status)?;
        let db = self.db.lock()?;
        let invoice = InvoiceService::new(&db).update_status(
            &session.try_into()?,
            invoice_id,
            status,
            expected_version,
        )?;
        Ok(invoice.into())
    }

    // =========================================================================
    // Backend Import
    // =========================================================================

    /// Import a branch list response. Returns the number of records stored.
    ///
    /// Every `import_*` call stores the whole list or, on any error, nothing.
    pub fn import_branches(&self, json: String) -> Result<u32, PetCareError> {
        let (items, _) = wire::parse_list::<wire::BackendBranch>(&json)?;
        self.import_all("branches", items, |db, item| {
            db.upsert_branch(&item.into())?;
            Ok(())
        })
    }

    pub fn import_employees(&self, json: String) -> Result<u32, PetCareError> {
        let (items, _) = wire::parse_list::<wire::BackendEmployee>(&json)?;
        self.import_all("employees", items, |db, item| {
            db.upsert_employee(&item.into())?;
            Ok(())
        })
    }

    pub fn import_customers(&self, json: String) -> Result<u32, PetCareError> {
        let (items, _) = wire::parse_list::<wire::BackendCustomer>(&json)?;
        self.import_all("customers", items, |db, item| {
            db.upsert_customer(&item.into())?;
            Ok(())
        })
    }

    pub fn import_pets(&self, json: String) -> Result<u32, PetCareError> {
        let (items, _) = wire::parse_list::<wire::BackendPet>(&json)?;
        self.import_all("pets", items, |db, item| {
            db.upsert_pet(&item.into())?;
            Ok(())
        })
    }

    /// Import bookings. Each must reference a known branch and a pet of its customer.
    pub fn import_bookings(&self, json: String) -> Result<u32, PetCareError> {
        let (items, _) = wire::parse_list::<wire::BackendBooking>(&json)?;
        let bookings = items
            .into_iter()
            .map(wire::BackendBooking::into_booking)
            .collect::<Result<Vec<_>, _>>()?;
        self.import_all("bookings", bookings, |db, booking| {
            check_booking_references(db, &booking)?;
            db.upsert_booking(&booking)?;
            Ok(())
        })
    }

    pub fn import_invoices(&self, json: String) -> Result<u32, PetCareError> {
        let (items, _) = wire::parse_list::<wire::BackendInvoice>(&json)?;
        let invoices = items
            .into_iter()
            .map(wire::BackendInvoice::into_invoice)
            .collect::<Result<Vec<_>, _>>()?;
        self.import_all("invoices", invoices, |db, invoice| {
            db.upsert_invoice(&invoice)?;
            Ok(())
        })
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// A debounced search session for one list screen.
    pub fn new_search(&self) -> Arc<SearchSession> {
        Arc::new(SearchSession {
            inner: Mutex::new(SearchController::new(&self.config.search)),
            started: Instant::now(),
        })
    }
}

/// Search controller handle for FFI. Times are milliseconds since the session started.
#[derive(uniffi::Object)]
pub struct SearchSession {
    inner: Mutex<SearchController>,
    started: Instant,
}

impl SearchSession {
    fn at(&self, elapsed_ms: u64) -> Instant {
        self.started + Duration::from_millis(elapsed_ms)
    }
}

#[uniffi::export]
impl SearchSession {
    pub fn input(&self, term: String, elapsed_ms: u64) -> Result<(), PetCareError> {
        self.inner.lock()?.input(&term, self.at(elapsed_ms));
        Ok(())
    }

    pub fn set_page(&self, page: u32) -> Result<(), PetCareError> {
        self.inner.lock()?.set_page(page);
        Ok(())
    }

    pub fn poll(&self, elapsed_ms: u64) -> Result<Option<FfiSearchTicket>, PetCareError> {
        let ticket = self.inner.lock()?.poll(self.at(elapsed_ms));
        Ok(ticket.map(|t| t.into()))
    }

    pub fn accept(&self, ticket: FfiSearchTicket) -> Result<bool, PetCareError> {
        Ok(self.inner.lock()?.accept(&ticket.into()))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe display language.
#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiLanguage {
    English,
    Vietnamese,
}

impl From<FfiLanguage> for Language {
    fn from(language: FfiLanguage) -> Self {
        match language {
            FfiLanguage::English => Language::English,
            FfiLanguage::Vietnamese => Language::Vietnamese,
        }
    }
}

/// FFI-safe session. `role` is one of admin, reception, veterinarian, sales, customer.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSession {
    pub role: String,
    pub user_id: i64,
    pub customer_id: Option<i64>,
    pub employee_id: Option<i64>,
    pub branch_id: Option<i64>,
}

impl From<SessionContext> for FfiSession {
    fn from(session: SessionContext) -> Self {
        Self {
            role: session.role.as_str().to_string(),
            user_id: session.user_id,
            customer_id: session.customer_id,
            employee_id: session.employee_id,
            branch_id: session.branch_id,
        }
    }
}

impl TryFrom<FfiSession> for SessionContext {
    type Error = PetCareError;

    fn try_from(session: FfiSession) -> Result<Self, Self::Error> {
        let role = Role::parse(&session.role)
            .ok_or_else(|| PetCareError::AuthRequired(format!("unknown role '{}'", session.role)))?;
        Ok(SessionContext {
            role,
            user_id: session.user_id,
            customer_id: session.customer_id,
            employee_id: session.employee_id,
            branch_id: session.branch_id,
        })
    }
}

/// FFI-safe booking request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewBooking {
    pub customer_id: i64,
    pub pet_id: i64,
    pub branch_id: i64,
    /// "auto", empty, or an employee id
    pub doctor: String,
    pub booking_type: String,
    pub requested_at: String,
    pub notes: Option<String>,
}

impl From<FfiNewBooking> for NewBooking {
    fn from(request: FfiNewBooking) -> Self {
        NewBooking {
            customer_id: request.customer_id,
            pet_id: request.pet_id,
            branch_id: request.branch_id,
            doctor: request.doctor,
            booking_type: request.booking_type,
            requested_at: request.requested_at,
            notes: request.notes,
        }
    }
}

/// FFI-safe booking edit. Unset fields are left unchanged.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBookingEdit {
    pub doctor: Option<String>,
    pub booking_type: Option<String>,
    pub requested_at: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

/// FFI-safe booking.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBooking {
    pub id: i64,
    pub customer_id: i64,
    pub pet_id: i64,
    pub branch_id: i64,
    pub doctor_id: Option<i64>,
    pub booking_type: String,
    /// RFC 3339, UTC
    pub requested_at: String,
    /// dd/MM/yyyy HH:mm at the clinic
    pub requested_at_display: String,
    pub status: String,
    pub status_label: String,
    pub notes: Option<String>,
    pub version: i64,
}

impl From<Booking> for FfiBooking {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            customer_id: booking.customer_id,
            pet_id: booking.pet_id,
            branch_id: booking.branch_id,
            doctor_id: booking.doctor_id,
            booking_type: booking.booking_type,
            requested_at: clinic_time::to_storage(booking.requested_at),
            requested_at_display: clinic_time::format_display(booking.requested_at),
            status: booking.status.as_str().to_string(),
            status_label: booking.status.label(Language::default()).to_string(),
            notes: booking.notes,
            version: booking.version,
        }
    }
}

/// FFI-safe list row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBookingSummary {
    pub booking: FfiBooking,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub pet_name: String,
    pub doctor_name: Option<String>,
}

impl From<models::BookingSummary> for FfiBookingSummary {
    fn from(summary: models::BookingSummary) -> Self {
        Self {
            booking: summary.booking.into(),
            customer_name: summary.customer_name,
            customer_phone: summary.customer_phone,
            pet_name: summary.pet_name,
            doctor_name: summary.doctor_name,
        }
    }
}

/// FFI-safe list filters.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBookingQuery {
    pub branch_id: Option<i64>,
    pub status: Option<String>,
    pub date: Option<String>,
    pub search: Option<String>,
}

/// FFI-safe booking page.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBookingPage {
    pub items: Vec<FfiBookingSummary>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// FFI-safe customer booking split.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCustomerBookings {
    pub upcoming: Vec<FfiBooking>,
    pub past: Vec<FfiBooking>,
}

/// FFI-safe schedule line.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiScheduleEntry {
    pub booking_id: i64,
    pub appointment_time: String,
    pub local_time: String,
    pub pet_name: String,
    pub activity: String,
    pub status: String,
}

impl From<ScheduleEntry> for FfiScheduleEntry {
    fn from(entry: ScheduleEntry) -> Self {
        Self {
            booking_id: entry.booking_id,
            appointment_time: clinic_time::to_storage(entry.appointment_time),
            local_time: entry.local_time,
            pet_name: entry.pet_name,
            activity: entry.activity,
            status: entry.status.as_str().to_string(),
        }
    }
}

/// FFI-safe employee.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEmployee {
    pub id: i64,
    pub branch_id: i64,
    pub full_name: String,
    pub position: String,
    pub code: Option<String>,
}

impl From<Employee> for FfiEmployee {
    fn from(employee: Employee) -> Self {
        Self {
            id: employee.id,
            branch_id: employee.branch_id,
            full_name: employee.full_name,
            position: employee.position.as_str().to_string(),
            code: employee.code,
        }
    }
}

/// FFI-safe vaccination entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewVaccineRecord {
    pub pet_id: i64,
    pub vaccine_id: i64,
    pub doctor_id: i64,
    pub dose: String,
    pub date_administered: String,
    pub next_due_date: Option<String>,
}

impl From<FfiNewVaccineRecord> for NewVaccineRecord {
    fn from(record: FfiNewVaccineRecord) -> Self {
        NewVaccineRecord {
            pet_id: record.pet_id,
            vaccine_id: record.vaccine_id,
            doctor_id: record.doctor_id,
            dose: record.dose,
            date_administered: record.date_administered,
            next_due_date: record.next_due_date,
        }
    }
}

/// FFI-safe vaccine record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVaccineRecord {
    pub id: i64,
    pub pet_id: i64,
    pub vaccine_id: i64,
    pub branch_id: i64,
    pub doctor_id: i64,
    pub dose: String,
    pub date_administered: String,
    pub next_due_date: Option<String>,
}

impl From<VaccineRecord> for FfiVaccineRecord {
    fn from(record: VaccineRecord) -> Self {
        Self {
            id: record.id,
            pet_id: record.pet_id,
            vaccine_id: record.vaccine_id,
            branch_id: record.branch_id,
            doctor_id: record.doctor_id,
            dose: record.dose,
            date_administered: record.date_administered,
            next_due_date: record.next_due_date,
        }
    }
}

/// FFI-safe result of completing a visit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitCompletion {
    pub booking: FfiBooking,
    pub vaccination: FfiVaccineRecord,
}

/// FFI-safe invoice line. Exactly one of product_id / service_id is set.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInvoiceLine {
    pub product_id: Option<i64>,
    pub service_id: Option<i64>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

impl From<models::InvoiceLine> for FfiInvoiceLine {
    fn from(line: models::InvoiceLine) -> Self {
        let (product_id, service_id) = match line.item {
            models::LineItemRef::Product(id) => (Some(id), None),
            models::LineItemRef::Service(id) => (None, Some(id)),
        };
        Self {
            product_id,
            service_id,
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total: line.total,
        }
    }
}

impl TryFrom<FfiInvoiceLine> for models::InvoiceLine {
    type Error = PetCareError;

    fn try_from(line: FfiInvoiceLine) -> Result<Self, Self::Error> {
        let item = match (line.product_id, line.service_id) {
            (Some(id), None) => models::LineItemRef::Product(id),
            (None, Some(id)) => models::LineItemRef::Service(id),
            _ => {
                return Err(PetCareError::InvalidInput(format!(
                    "line '{}' needs exactly one of product or service",
                    line.description
                )))
            }
        };
        Ok(models::InvoiceLine {
            item,
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total: line.total,
        })
    }
}

/// FFI-safe invoice.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInvoice {
    pub id: i64,
    pub customer_id: i64,
    pub branch_id: i64,
    pub invoice_date: String,
    pub total_amount: f64,
    pub discount_amount: f64,
    pub final_amount: Option<f64>,
    pub effective_amount: f64,
    pub status: String,
    pub lines: Vec<FfiInvoiceLine>,
    pub version: i64,
}

impl From<Invoice> for FfiInvoice {
    fn from(invoice: Invoice) -> Self {
        Self {
            effective_amount: invoice.effective_amount(),
            id: invoice.id,
            customer_id: invoice.customer_id,
            branch_id: invoice.branch_id,
            invoice_date: invoice.invoice_date,
            total_amount: invoice.total_amount,
            discount_amount: invoice.discount_amount,
            final_amount: invoice.final_amount,
            status: invoice.status.as_str().to_string(),
            lines: invoice.lines.into_iter().map(|l| l.into()).collect(),
            version: invoice.version,
        }
    }
}

impl TryFrom<FfiInvoice> for Invoice {
    type Error = PetCareError;

    fn try_from(invoice: FfiInvoice) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: invoice.id,
            customer_id: invoice.customer_id,
            branch_id: invoice.branch_id,
            invoice_date: invoice.invoice_date,
            total_amount: invoice.total_amount,
            discount_amount: invoice.discount_amount,
            final_amount: invoice.final_amount,
            status: parse_invoice_status(&invoice.status)?,
            lines: invoice
                .lines
                .into_iter()
                .map(models::InvoiceLine::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            version: invoice.version,
        })
    }
}

/// FFI-safe invoice page.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInvoicePage {
    pub items: Vec<FfiInvoice>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// FFI-safe search ticket.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSearchTicket {
    pub generation: u64,
    pub term: String,
    pub page: u32,
}

impl From<SearchTicket> for FfiSearchTicket {
    fn from(ticket: SearchTicket) -> Self {
        Self {
            generation: ticket.generation,
            term: ticket.term,
            page: ticket.page,
        }
    }
}

impl From<FfiSearchTicket> for SearchTicket {
    fn from(ticket: FfiSearchTicket) -> Self {
        Self {
            generation: ticket.generation,
            term: ticket.term,
            page: ticket.page,
        }
    }
}
