//! Booking lifecycle manager.
//!
//! Owns creation, status transitions, availability and role-scoped reads of
//! bookings. Every operation takes the caller's [`SessionContext`] explicitly.
//!
//! ```text
//!             confirm / check-in            complete
//!   Pending ─────────────────────▶ Confirmed ─────────▶ Completed
//!      │                              │
//!      │ cancel                       │ cancel
//!      ▼                              ▼
//!   Cancelled ◀───────────────────────┘
//! ```
//!
//! Completed and Cancelled are terminal. Writes are conditional on the
//! booking's version, so two operators editing the same booking can not
//! silently overwrite each other.

mod availability;
mod lifecycle;
mod vaccination;
mod views;

pub use views::BookingQuery;

use thiserror::Error;

use crate::clinic_time::TimeError;
use crate::config::BookingSettings;
use crate::db::{Database, DbError};
use crate::models::{AuthRequired, Booking, BookingStatus, Language, Role, SessionContext, StatusLabel};

/// Booking errors.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot change booking status from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict { id: i64, expected: i64, actual: i64 },

    #[error("Doctor {doctor_id} already has a booking at that time")]
    Unavailable { doctor_id: i64 },

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error(transparent)]
    AuthRequired(#[from] AuthRequired),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl From<TimeError> for BookingError {
    fn from(e: TimeError) -> Self {
        BookingError::Validation(e.to_string())
    }
}

impl BookingError {
    /// Text to show the user. Every failure has one.
    pub fn user_message(&self, language: Language) -> String {
        match (self, language) {
            (BookingError::Validation(msg), _) => msg.clone(),
            (BookingError::NotFound(what), Language::English) => format!("{} was not found", what),
            (BookingError::NotFound(what), Language::Vietnamese) => format!("Không tìm thấy {}", what),
            (BookingError::InvalidTransition { from, to }, Language::English) => format!(
                "A {} booking can not be changed to {}",
                from.label(language),
                to.label(language)
            ),
            (BookingError::InvalidTransition { from, to }, Language::Vietnamese) => format!(
                "Không thể chuyển lịch hẹn từ '{}' sang '{}'",
                from.label(language),
                to.label(language)
            ),
            (BookingError::Conflict { .. }, Language::English) => {
                "This booking was just changed by someone else. Reload and try again.".into()
            }
            (BookingError::Conflict { .. }, Language::Vietnamese) => {
                "Lịch hẹn vừa được người khác cập nhật. Vui lòng tải lại.".into()
            }
            (BookingError::Unavailable { .. }, Language::English) => {
                "The selected doctor is busy at that time".into()
            }
            (BookingError::Unavailable { .. }, Language::Vietnamese) => {
                "Bác sĩ đã có lịch vào thời gian này".into()
            }
            (BookingError::Forbidden(_), Language::English) => "You can not do this".into(),
            (BookingError::Forbidden(_), Language::Vietnamese) => {
                "Bạn không có quyền thực hiện thao tác này".into()
            }
            (BookingError::AuthRequired(_), Language::English) => "Please log in again".into(),
            (BookingError::AuthRequired(_), Language::Vietnamese) => {
                "Vui lòng đăng nhập lại".into()
            }
            (BookingError::Storage(_), Language::English) => "Something went wrong".into(),
            (BookingError::Storage(_), Language::Vietnamese) => "Lỗi".into(),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

/// Booking lifecycle manager over the local data store.
pub struct BookingManager<'a> {
    db: &'a Database,
    settings: BookingSettings,
}

impl<'a> BookingManager<'a> {
    /// Create a manager with explicit booking rules.
    pub fn new(db: &'a Database, settings: BookingSettings) -> Self {
        Self { db, settings }
    }

    /// Create a manager with default booking rules.
    pub fn with_defaults(db: &'a Database) -> Self {
        Self::new(db, BookingSettings::default())
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    fn load_booking(&self, booking_id: i64) -> BookingResult<Booking> {
        self.db
            .get_booking(booking_id)?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))
    }

    /// Customers act on their own bookings; staff on bookings of their branch.
    fn authorize(&self, session: &SessionContext, booking: &Booking) -> BookingResult<()> {
        let allowed = match session.role {
            Role::Customer => session.require_customer()? == booking.customer_id,
            _ => session.covers_branch(booking.branch_id),
        };
        if allowed {
            Ok(())
        } else {
            tracing::warn!(
                booking_id = booking.id,
                role = session.role.as_str(),
                user_id = session.user_id,
                "Booking access denied"
            );
            Err(BookingError::Forbidden(format!(
                "booking {} is outside this session's scope",
                booking.id
            )))
        }
    }

    fn require_staff(&self, session: &SessionContext) -> BookingResult<()> {
        if session.role.is_staff() {
            Ok(())
        } else {
            Err(BookingError::Forbidden("staff session required".into()))
        }
    }

    /// Write `booking` back, conditional on the version it was read at.
    fn commit(&self, mut booking: Booking) -> BookingResult<Booking> {
        let expected = booking.version;
        booking.touch();
        if !self.db.update_booking(&booking, expected)? {
            return Err(match self.db.get_booking(booking.id)? {
                None => BookingError::NotFound(format!("booking {}", booking.id)),
                Some(current) => {
                    tracing::warn!(
                        booking_id = booking.id,
                        expected,
                        actual = current.version,
                        "Booking write lost a race"
                    );
                    BookingError::Conflict {
                        id: booking.id,
                        expected,
                        actual: current.version,
                    }
                }
            });
        }
        booking.version = expected + 1;
        Ok(booking)
    }
}

/// Reject a caller's stale view of the booking before doing any work.
fn check_version(booking: &Booking, expected_version: Option<i64>) -> BookingResult<()> {
    match expected_version {
        Some(expected) if expected != booking.version => Err(BookingError::Conflict {
            id: booking.id,
            expected,
            actual: booking.version,
        }),
        _ => Ok(()),
    }
}

/// Reject transitions the state machine does not allow.
fn check_transition(booking: &Booking, next: BookingStatus) -> BookingResult<()> {
    if booking.status.can_transition_to(next) {
        Ok(())
    } else {
        tracing::warn!(
            booking_id = booking.id,
            from = booking.status.as_str(),
            to = next.as_str(),
            "Rejected booking status change"
        );
        Err(BookingError::InvalidTransition {
            from: booking.status,
            to: next,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::Database;
    use crate::models::{Branch, Customer, Employee, Pet, Position, SessionContext, Role};

    /// Two branches, one customer with a pet, a vet and a receptionist per branch.
    pub struct Clinic {
        pub db: Database,
        pub branch_id: i64,
        pub other_branch_id: i64,
        pub customer_id: i64,
        pub pet_id: i64,
        pub vet_id: i64,
        pub reception_id: i64,
        pub other_vet_id: i64,
    }

    impl Clinic {
        pub fn new() -> Self {
            let db = Database::open_in_memory().unwrap();
            let branch_id = db.upsert_branch(&Branch::new("District 1".into())).unwrap();
            let other_branch_id = db.upsert_branch(&Branch::new("District 3".into())).unwrap();

            let mut customer = Customer::new("Nguyen Van An".into());
            customer.phone = Some("0901112222".into());
            let customer_id = db.upsert_customer(&customer).unwrap();
            let pet_id = db
                .upsert_pet(&Pet::new(customer_id, "Milo".into(), "canine".into()))
                .unwrap();

            let vet_id = db
                .upsert_employee(&Employee::new(branch_id, "Dr. Minh".into(), Position::Veterinarian))
                .unwrap();
            let reception_id = db
                .upsert_employee(&Employee::new(branch_id, "Lan".into(), Position::Reception))
                .unwrap();
            let other_vet_id = db
                .upsert_employee(&Employee::new(other_branch_id, "Dr. Hoa".into(), Position::Veterinarian))
                .unwrap();

            Self {
                db,
                branch_id,
                other_branch_id,
                customer_id,
                pet_id,
                vet_id,
                reception_id,
                other_vet_id,
            }
        }

        pub fn reception(&self) -> SessionContext {
            SessionContext::staff(Role::Reception, self.reception_id, self.branch_id)
        }

        pub fn customer(&self) -> SessionContext {
            SessionContext::customer(100, self.customer_id)
        }

        pub fn add_pet(&self, customer_id: i64, name: &str) -> i64 {
            self.db
                .upsert_pet(&Pet::new(customer_id, name.into(), "feline".into()))
                .unwrap()
        }
    }
}
