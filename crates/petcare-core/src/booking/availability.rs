//! Doctor schedules and availability.

use chrono::{DateTime, Duration, Utc};

use super::{BookingError, BookingManager, BookingResult};
use crate::clinic_time;
use crate::models::{Employee, Position, ScheduleEntry};

impl<'a> BookingManager<'a> {
    /// A doctor's non-cancelled bookings on a clinic calendar day (`YYYY-MM-DD`).
    ///
    /// Ordered by appointment time. An unknown doctor or a free day gives an
    /// empty list.
    pub fn doctor_schedule(&self, doctor_id: i64, date: &str) -> BookingResult<Vec<ScheduleEntry>> {
        let day = clinic_time::parse_date(date)?;
        let entries = self.db.list_doctor_day(doctor_id, day)?;
        tracing::debug!(doctor_id, date, count = entries.len(), "Loaded doctor schedule");
        Ok(entries)
    }

    /// Whether the doctor has no booking within one slot of `at`.
    pub fn doctor_is_free(&self, doctor_id: i64, at: DateTime<Utc>, exclude_booking: Option<i64>) -> BookingResult<bool> {
        let slot = self.slot();
        let clashes = self
            .db
            .count_doctor_bookings_between(doctor_id, at - slot, at + slot, exclude_booking)?;
        Ok(clashes == 0)
    }

    /// Veterinarians of a branch who are free at `at`.
    pub fn available_doctors(&self, branch_id: i64, at: &str) -> BookingResult<Vec<Employee>> {
        let at = clinic_time::parse_timestamp(at)?;
        let mut free = Vec::new();
        for doctor in self.db.list_employees(branch_id, Some(Position::Veterinarian))? {
            if self.doctor_is_free(doctor.id, at, None)? {
                free.push(doctor);
            }
        }
        Ok(free)
    }

    /// Check that an explicitly chosen doctor can take a booking at `at`.
    pub(super) fn ensure_doctor_assignable(
        &self,
        doctor_id: i64,
        branch_id: i64,
        at: DateTime<Utc>,
        exclude_booking: Option<i64>,
    ) -> BookingResult<()> {
        let doctor = self
            .db
            .get_employee(doctor_id)?
            .ok_or_else(|| BookingError::NotFound(format!("doctor {}", doctor_id)))?;
        if !doctor.is_doctor() || doctor.branch_id != branch_id {
            return Err(BookingError::Validation(format!(
                "employee {} is not a doctor at branch {}",
                doctor_id, branch_id
            )));
        }
        if !self.doctor_is_free(doctor_id, at, exclude_booking)? {
            tracing::info!(
                doctor_id,
                at = %clinic_time::to_storage(at),
                "Doctor already booked"
            );
            return Err(BookingError::Unavailable { doctor_id });
        }
        Ok(())
    }

    fn slot(&self) -> Duration {
        Duration::minutes(i64::from(self.settings.slot_minutes))
    }
}
