//! Booking (appointment) models and the booking status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical booking status.
///
/// Display-language variants ("Chờ xác nhận", "CANCELED", ...) are aliases of
/// these four states, resolved through [`crate::models::labels`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    /// Requested, not yet confirmed by the clinic
    Pending,
    /// Confirmed or checked in
    Confirmed,
    /// Visit done (terminal)
    Completed,
    /// Cancelled by customer or staff (terminal)
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    /// Storage / wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Completed and Cancelled accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Whether `self -> next` is an allowed lifecycle step.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }

    /// States reachable in one step.
    pub fn successors(&self) -> Vec<BookingStatus> {
        Self::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Doctor selection on a booking form.
///
/// The form offers an "auto" entry meaning no specific doctor; it must never
/// reach storage as a literal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorChoice {
    Auto,
    Specific(i64),
}

impl DoctorChoice {
    pub const AUTO_SENTINEL: &'static str = "auto";

    /// Parse the raw form value: `"auto"`, empty, or an employee id.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::AUTO_SENTINEL) {
            return Some(DoctorChoice::Auto);
        }
        trimmed.parse::<i64>().ok().filter(|id| *id > 0).map(DoctorChoice::Specific)
    }

    /// The nullable doctor id that gets persisted.
    pub fn doctor_id(&self) -> Option<i64> {
        match self {
            DoctorChoice::Auto => None,
            DoctorChoice::Specific(id) => Some(*id),
        }
    }
}

/// A persisted booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub customer_id: i64,
    pub pet_id: i64,
    pub branch_id: i64,
    /// None when the customer let the clinic assign a doctor
    pub doctor_id: Option<i64>,
    /// Service name / booking type (free text)
    pub booking_type: String,
    pub requested_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub notes: Option<String>,
    /// Optimistic concurrency counter, bumped on every write
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Booking {
    /// Whether the booking falls on or after `now`.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.requested_at >= now
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().to_rfc3339();
    }
}

/// Booking creation request, as submitted by a customer or reception form.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub customer_id: i64,
    pub pet_id: i64,
    pub branch_id: i64,
    /// Raw doctor field: `"auto"`, empty, or an employee id
    pub doctor: String,
    pub booking_type: String,
    /// Raw timestamp; naive values are read in the clinic timezone
    pub requested_at: String,
    pub notes: Option<String>,
}

/// Full-representation edit of an existing booking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingEdit {
    pub doctor: Option<String>,
    pub booking_type: Option<String>,
    pub requested_at: Option<String>,
    pub notes: Option<String>,
    pub status: Option<BookingStatus>,
}

/// List row for staff screens: a booking plus the names searched on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingSummary {
    pub booking: Booking,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub pet_name: String,
    pub doctor_name: Option<String>,
}

/// One line of a doctor's day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub booking_id: i64,
    pub appointment_time: DateTime<Utc>,
    /// `HH:MM` in the clinic timezone
    pub local_time: String,
    pub pet_name: String,
    /// The booking type
    pub activity: String,
    pub status: BookingStatus,
}

/// Customer-facing booking split, computed at read time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomerBookings {
    /// `requested_at >= now`, soonest first
    pub upcoming: Vec<Booking>,
    /// `requested_at < now`, most recent first
    pub past: Vec<Booking>,
}

impl CustomerBookings {
    /// Partition bookings around `now`. Every booking lands in exactly one list.
    pub fn split(bookings: Vec<Booking>, now: DateTime<Utc>) -> Self {
        let (mut upcoming, mut past): (Vec<_>, Vec<_>) =
            bookings.into_iter().partition(|b| b.is_upcoming(now));
        upcoming.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
        past.sort_by(|a, b| b.requested_at.cmp(&a.requested_at).then(b.id.cmp(&a.id)));
        Self { upcoming, past }
    }

    pub fn len(&self) -> usize {
        self.upcoming.len() + self.past.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
