//! Vaccination records attached to visits.

use chrono::Utc;

use super::{check_transition, BookingError, BookingManager, BookingResult};
use crate::clinic_time;
use crate::models::{Booking, BookingStatus, NewVaccineRecord, Role, SessionContext, VaccineRecord};

impl<'a> BookingManager<'a> {
    /// Append a vaccination to a pet's history.
    pub fn record_vaccination(&self, session: &SessionContext, entry: &NewVaccineRecord) -> BookingResult<VaccineRecord> {
        self.require_staff(session)?;
        let record = self.prepare_vaccination(session, entry)?;
        self.append_vaccination(record)
    }

    /// A pet's vaccination history, most recent first.
    ///
    /// Customers can read the history of their own pets only.
    pub fn vaccine_history(&self, session: &SessionContext, pet_id: i64) -> BookingResult<Vec<VaccineRecord>> {
        let pet = self
            .db
            .get_pet(pet_id)?
            .ok_or_else(|| BookingError::NotFound(format!("pet {}", pet_id)))?;
        if session.role == Role::Customer && !pet.is_owned_by(session.require_customer()?) {
            return Err(BookingError::Forbidden(format!(
                "pet {} belongs to another customer",
                pet_id
            )));
        }
        Ok(self.db.list_vaccine_records_for_pet(pet_id)?)
    }

    /// Record the vaccination given during a visit and complete the booking.
    ///
    /// Both writes land together or not at all.
    pub fn complete_with_vaccination(
        &self,
        session: &SessionContext,
        booking_id: i64,
        entry: &NewVaccineRecord,
    ) -> BookingResult<(Booking, VaccineRecord)> {
        self.require_staff(session)?;
        let mut booking = self.load_booking(booking_id)?;
        self.authorize(session, &booking)?;
        if entry.pet_id != booking.pet_id {
            return Err(BookingError::Validation(format!(
                "pet {} is not the pet of booking {}",
                entry.pet_id, booking_id
            )));
        }
        check_transition(&booking, BookingStatus::Completed)?;
        let record = self.prepare_vaccination(session, entry)?;
        if record.branch_id != booking.branch_id {
            return Err(BookingError::Validation(format!(
                "doctor {} does not work at branch {}",
                record.doctor_id, booking.branch_id
            )));
        }

        let (booking, record) = self.db.atomically(|| -> BookingResult<(Booking, VaccineRecord)> {
            let record = self.append_vaccination(record)?;
            booking.status = BookingStatus::Completed;
            let booking = self.commit(booking)?;
            Ok((booking, record))
        })?;

        tracing::info!(
            booking_id,
            record_id = record.id,
            "Booking completed with vaccination"
        );
        Ok((booking, record))
    }

    fn prepare_vaccination(&self, session: &SessionContext, entry: &NewVaccineRecord) -> BookingResult<VaccineRecord> {
        self.db
            .get_pet(entry.pet_id)?
            .ok_or_else(|| BookingError::NotFound(format!("pet {}", entry.pet_id)))?;
        let doctor = self
            .db
            .get_employee(entry.doctor_id)?
            .ok_or_else(|| BookingError::NotFound(format!("doctor {}", entry.doctor_id)))?;
        if !doctor.is_doctor() {
            return Err(BookingError::Validation(format!(
                "employee {} is not a doctor",
                entry.doctor_id
            )));
        }
        if !session.covers_branch(doctor.branch_id) {
            return Err(BookingError::Forbidden(format!(
                "branch {} is outside this session's scope",
                doctor.branch_id
            )));
        }
        if entry.dose.trim().is_empty() {
            return Err(BookingError::Validation("dose is required".into()));
        }

        let administered = clinic_time::parse_date(&entry.date_administered)?;
        if let Some(next_due) = &entry.next_due_date {
            if clinic_time::parse_date(next_due)? < administered {
                return Err(BookingError::Validation(format!(
                    "next due date {} is before {}",
                    next_due, entry.date_administered
                )));
            }
        }

        Ok(VaccineRecord {
            id: 0,
            pet_id: entry.pet_id,
            vaccine_id: entry.vaccine_id,
            branch_id: doctor.branch_id,
            doctor_id: doctor.id,
            dose: entry.dose.trim().to_string(),
            date_administered: administered.format("%Y-%m-%d").to_string(),
            next_due_date: entry.next_due_date.as_ref().map(|d| d.trim().to_string()),
            created_at: Utc::now().to_rfc3339(),
        })
    }

    fn append_vaccination(&self, mut record: VaccineRecord) -> BookingResult<VaccineRecord> {
        record.id = self.db.insert_vaccine_record(&record)?;
        tracing::info!(
            record_id = record.id,
            pet_id = record.pet_id,
            vaccine_id = record.vaccine_id,
            "Vaccination recorded"
        );
        Ok(record)
    }
}
