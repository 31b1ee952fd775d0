//! Booking creation and status transitions.

use chrono::{DateTime, Utc};

use super::{check_transition, check_version, BookingError, BookingManager, BookingResult};
use crate::clinic_time;
use crate::models::{Booking, BookingEdit, BookingStatus, DoctorChoice, NewBooking, Role, SessionContext};

impl<'a> BookingManager<'a> {
    /// Create a booking. The result is always Pending, whoever creates it.
    pub fn create_booking(&self, session: &SessionContext, request: &NewBooking) -> BookingResult<Booking> {
        match session.role {
            Role::Customer => {
                if session.require_customer()? != request.customer_id {
                    return Err(BookingError::Forbidden(
                        "customers can only book for themselves".into(),
                    ));
                }
            }
            _ if !session.covers_branch(request.branch_id) => {
                return Err(BookingError::Forbidden(format!(
                    "branch {} is outside this session's scope",
                    request.branch_id
                )));
            }
            _ => {}
        }

        let booking_type = request.booking_type.trim();
        if booking_type.is_empty() {
            return Err(BookingError::Validation("booking type is required".into()));
        }

        let requested_at = clinic_time::parse_timestamp(&request.requested_at)?;
        self.check_not_past(requested_at)?;

        self.db
            .get_customer(request.customer_id)?
            .ok_or_else(|| BookingError::NotFound(format!("customer {}", request.customer_id)))?;
        let pet = self
            .db
            .get_pet(request.pet_id)?
            .ok_or_else(|| BookingError::NotFound(format!("pet {}", request.pet_id)))?;
        if !pet.is_owned_by(request.customer_id) {
            return Err(BookingError::Validation(format!(
                "pet {} does not belong to customer {}",
                request.pet_id, request.customer_id
            )));
        }
        self.db
            .get_branch(request.branch_id)?
            .ok_or_else(|| BookingError::NotFound(format!("branch {}", request.branch_id)))?;

        let doctor = DoctorChoice::parse(&request.doctor).ok_or_else(|| {
            BookingError::Validation(format!("invalid doctor selection '{}'", request.doctor))
        })?;
        if let DoctorChoice::Specific(doctor_id) = doctor {
            self.ensure_doctor_assignable(doctor_id, request.branch_id, requested_at, None)?;
        }

        let now = Utc::now().to_rfc3339();
        let mut booking = Booking {
            id: 0,
            customer_id: request.customer_id,
            pet_id: request.pet_id,
            branch_id: request.branch_id,
            doctor_id: doctor.doctor_id(),
            booking_type: booking_type.to_string(),
            requested_at,
            status: BookingStatus::Pending,
            notes: normalize_notes(request.notes.as_deref()),
            version: 1,
            created_at: now.clone(),
            updated_at: now,
        };
        booking.id = self.db.insert_booking(&booking)?;

        tracing::info!(
            booking_id = booking.id,
            customer_id = booking.customer_id,
            branch_id = booking.branch_id,
            doctor_id = ?booking.doctor_id,
            requested_at = %clinic_time::to_storage(booking.requested_at),
            "Booking created"
        );
        Ok(booking)
    }

    /// Move a booking to `new_status`.
    ///
    /// Customers may only cancel their own bookings. `expected_version` is the
    /// version the caller last saw; None skips the early staleness check but
    /// the write itself is still conditional.
    pub fn update_status(
        &self,
        session: &SessionContext,
        booking_id: i64,
        new_status: BookingStatus,
        expected_version: Option<i64>,
    ) -> BookingResult<Booking> {
        let mut booking = self.load_booking(booking_id)?;
        self.authorize(session, &booking)?;
        if session.role == Role::Customer && new_status != BookingStatus::Cancelled {
            return Err(BookingError::Forbidden(
                "customers can only cancel bookings".into(),
            ));
        }
        check_version(&booking, expected_version)?;
        check_transition(&booking, new_status)?;

        let from = booking.status;
        booking.status = new_status;
        let booking = self.commit(booking)?;

        tracing::info!(
            booking_id,
            from = from.as_str(),
            to = new_status.as_str(),
            user_id = session.user_id,
            "Booking status changed"
        );
        Ok(booking)
    }

    /// Apply a full edit of a booking.
    ///
    /// A status carried in the edit goes through the state machine; resending
    /// the current status is not a transition. Closed bookings can not be edited.
    pub fn edit_booking(
        &self,
        session: &SessionContext,
        booking_id: i64,
        edit: &BookingEdit,
        expected_version: Option<i64>,
    ) -> BookingResult<Booking> {
        let mut booking = self.load_booking(booking_id)?;
        self.authorize(session, &booking)?;
        check_version(&booking, expected_version)?;

        let status_change = edit.status.filter(|s| *s != booking.status);
        if booking.status.is_terminal() {
            return Err(match status_change {
                Some(to) => BookingError::InvalidTransition {
                    from: booking.status,
                    to,
                },
                None => BookingError::Validation(format!(
                    "booking {} is {} and can no longer be edited",
                    booking_id, booking.status
                )),
            });
        }
        if let Some(to) = status_change {
            if session.role == Role::Customer && to != BookingStatus::Cancelled {
                return Err(BookingError::Forbidden(
                    "customers can only cancel bookings".into(),
                ));
            }
            check_transition(&booking, to)?;
        }

        if let Some(booking_type) = &edit.booking_type {
            let booking_type = booking_type.trim();
            if booking_type.is_empty() {
                return Err(BookingError::Validation("booking type is required".into()));
            }
            booking.booking_type = booking_type.to_string();
        }

        let mut reschedule = false;
        if let Some(raw) = &edit.requested_at {
            let requested_at = clinic_time::parse_timestamp(raw)?;
            if requested_at != booking.requested_at {
                self.check_not_past(requested_at)?;
                reschedule = true;
            }
            booking.requested_at = requested_at;
        }
        if let Some(raw) = &edit.doctor {
            let doctor = DoctorChoice::parse(raw).ok_or_else(|| {
                BookingError::Validation(format!("invalid doctor selection '{}'", raw))
            })?;
            reschedule |= doctor.doctor_id() != booking.doctor_id;
            booking.doctor_id = doctor.doctor_id();
        }
        if reschedule {
            if let Some(doctor_id) = booking.doctor_id {
                self.ensure_doctor_assignable(
                    doctor_id,
                    booking.branch_id,
                    booking.requested_at,
                    Some(booking.id),
                )?;
            }
        }

        if edit.notes.is_some() {
            booking.notes = normalize_notes(edit.notes.as_deref());
        }
        if let Some(to) = status_change {
            booking.status = to;
        }

        let booking = self.commit(booking)?;
        tracing::info!(
            booking_id,
            status = booking.status.as_str(),
            version = booking.version,
            "Booking edited"
        );
        Ok(booking)
    }

    /// Check a customer in: Pending → Confirmed, by reception staff of the booking's branch.
    pub fn check_in(&self, session: &SessionContext, booking_id: i64, employee_id: i64) -> BookingResult<Booking> {
        self.require_staff(session)?;
        let employee = self
            .db
            .get_employee(employee_id)?
            .ok_or_else(|| BookingError::NotFound(format!("employee {}", employee_id)))?;

        let mut booking = self.load_booking(booking_id)?;
        self.authorize(session, &booking)?;
        if employee.branch_id != booking.branch_id || !employee.can_check_in() {
            return Err(BookingError::Forbidden(format!(
                "employee {} is not reception staff at branch {}",
                employee_id, booking.branch_id
            )));
        }
        check_transition(&booking, BookingStatus::Confirmed)?;

        booking.status = BookingStatus::Confirmed;
        let booking = self.commit(booking)?;
        tracing::info!(booking_id, employee_id, "Customer checked in");
        Ok(booking)
    }

    fn check_not_past(&self, requested_at: DateTime<Utc>) -> BookingResult<()> {
        if self.settings.reject_past_bookings && requested_at < Utc::now() {
            return Err(BookingError::Validation(format!(
                "requested time {} is in the past",
                clinic_time::format_display(requested_at)
            )));
        }
        Ok(())
    }
}

fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::test_support::Clinic;
    use crate::config::BookingSettings;

    fn request(clinic: &Clinic, doctor: &str, at: &str) -> NewBooking {
        NewBooking {
            customer_id: clinic.customer_id,
            pet_id: clinic.pet_id,
            branch_id: clinic.branch_id,
            doctor: doctor.into(),
            booking_type: "Vaccination".into(),
            requested_at: at.into(),
            notes: Some("  ".into()),
        }
    }

    #[test]
    fn test_create_forces_pending_and_nulls_auto_doctor() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);

        let booking = manager
            .create_booking(&clinic.customer(), &request(&clinic, "auto", "2025-03-01T09:00"))
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.doctor_id, None);
        assert_eq!(booking.notes, None);
        assert_eq!(booking.version, 1);

        let stored = clinic.db.get_booking(booking.id).unwrap().unwrap();
        assert_eq!(stored.doctor_id, None);
        assert_eq!(stored.status, BookingStatus::Pending);
    }

    #[test]
    fn test_created_booking_matches_stored_row() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);

        let booking = manager
            .create_booking(&clinic.reception(), &request(&clinic, "auto", "2025-03-01T09:00:00.750"))
            .unwrap();
        let stored = clinic.db.get_booking(booking.id).unwrap().unwrap();
        assert_eq!(stored.requested_at, booking.requested_at);
        assert_eq!(clinic_time::to_storage(booking.requested_at), "2025-03-01T02:00:00Z");
    }

    #[test]
    fn test_create_rejects_pet_of_other_customer() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let stranger = clinic
            .db
            .upsert_customer(&crate::models::Customer::new("Le Thi C".into()))
            .unwrap();
        let stranger_pet = clinic.add_pet(stranger, "Mun");

        let mut req = request(&clinic, "auto", "2025-03-01T09:00");
        req.pet_id = stranger_pet;
        let err = manager.create_booking(&clinic.reception(), &req).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[test]
    fn test_create_validates_references() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let admin = SessionContext::staff(Role::Admin, 1, clinic.branch_id);

        let mut req = request(&clinic, "auto", "2025-03-01T09:00");
        req.branch_id = 999;
        assert!(matches!(
            manager.create_booking(&admin, &req),
            Err(BookingError::NotFound(_))
        ));

        let mut req = request(&clinic, "auto", "2025-03-01T09:00");
        req.pet_id = 999;
        assert!(matches!(
            manager.create_booking(&admin, &req),
            Err(BookingError::NotFound(_))
        ));

        let req = request(&clinic, "auto", "next tuesday");
        assert!(matches!(
            manager.create_booking(&admin, &req),
            Err(BookingError::Validation(_))
        ));

        let mut req = request(&clinic, "auto", "2025-03-01T09:00");
        req.booking_type = " ".into();
        assert!(matches!(
            manager.create_booking(&admin, &req),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_create_with_doctor_checks_branch_and_slot() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let session = clinic.reception();

        // Doctor from another branch
        let req = request(&clinic, &clinic.other_vet_id.to_string(), "2025-03-01T09:00");
        assert!(matches!(
            manager.create_booking(&session, &req),
            Err(BookingError::Validation(_))
        ));

        // Receptionist is not a doctor
        let req = request(&clinic, &clinic.reception_id.to_string(), "2025-03-01T09:00");
        assert!(matches!(
            manager.create_booking(&session, &req),
            Err(BookingError::Validation(_))
        ));

        let vet = clinic.vet_id.to_string();
        let first = manager
            .create_booking(&session, &request(&clinic, &vet, "2025-03-01T09:00"))
            .unwrap();
        assert_eq!(first.doctor_id, Some(clinic.vet_id));

        // Overlapping slot
        let err = manager
            .create_booking(&session, &request(&clinic, &vet, "2025-03-01T09:15"))
            .unwrap_err();
        assert!(matches!(err, BookingError::Unavailable { .. }));

        // Back-to-back is fine
        assert!(manager
            .create_booking(&session, &request(&clinic, &vet, "2025-03-01T09:30"))
            .is_ok());
    }

    #[test]
    fn test_create_scope_checks() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);

        let other_customer = SessionContext::customer(200, clinic.customer_id + 50);
        assert!(matches!(
            manager.create_booking(&other_customer, &request(&clinic, "auto", "2025-03-01T09:00")),
            Err(BookingError::Forbidden(_))
        ));

        let other_branch_staff = SessionContext::staff(Role::Reception, 9, clinic.other_branch_id);
        assert!(matches!(
            manager.create_booking(&other_branch_staff, &request(&clinic, "auto", "2025-03-01T09:00")),
            Err(BookingError::Forbidden(_))
        ));
    }

    #[test]
    fn test_past_bookings_follow_settings() {
        let clinic = Clinic::new();
        let lenient = BookingManager::with_defaults(&clinic.db);
        assert!(lenient
            .create_booking(&clinic.reception(), &request(&clinic, "auto", "2001-01-01T09:00"))
            .is_ok());

        let strict = BookingManager::new(
            &clinic.db,
            BookingSettings {
                reject_past_bookings: true,
                ..Default::default()
            },
        );
        assert!(matches!(
            strict.create_booking(&clinic.reception(), &request(&clinic, "auto", "2001-01-01T10:00")),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_strict_settings_reject_reschedule_into_past() {
        let clinic = Clinic::new();
        let strict = BookingManager::new(
            &clinic.db,
            BookingSettings {
                reject_past_bookings: true,
                ..Default::default()
            },
        );
        let session = clinic.reception();
        let booking = strict
            .create_booking(&session, &request(&clinic, "auto", "2099-01-01T09:00"))
            .unwrap();

        let into_past = BookingEdit {
            requested_at: Some("2001-01-01T09:00".into()),
            ..Default::default()
        };
        assert!(matches!(
            strict.edit_booking(&session, booking.id, &into_past, Some(booking.version)),
            Err(BookingError::Validation(_))
        ));
        let stored = clinic.db.get_booking(booking.id).unwrap().unwrap();
        assert_eq!(stored.requested_at, booking.requested_at);

        // Resending the unchanged time is not a reschedule
        let same_time = BookingEdit {
            requested_at: Some("2099-01-01T09:00".into()),
            notes: Some("bring records".into()),
            ..Default::default()
        };
        let edited = strict
            .edit_booking(&session, booking.id, &same_time, Some(booking.version))
            .unwrap();
        assert_eq!(edited.notes.as_deref(), Some("bring records"));
    }

    #[test]
    fn test_full_lifecycle() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let session = clinic.reception();

        let booking = manager
            .create_booking(&session, &request(&clinic, "auto", "2025-03-01T09:00"))
            .unwrap();
        let booking = manager
            .update_status(&session, booking.id, BookingStatus::Confirmed, Some(1))
            .unwrap();
        assert_eq!(booking.version, 2);
        let booking = manager
            .update_status(&session, booking.id, BookingStatus::Completed, Some(2))
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);

        for next in BookingStatus::ALL {
            let err = manager
                .update_status(&session, booking.id, next, None)
                .unwrap_err();
            assert!(matches!(err, BookingError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_update_status_errors() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let session = clinic.reception();

        assert!(matches!(
            manager.update_status(&session, 404, BookingStatus::Confirmed, None),
            Err(BookingError::NotFound(_))
        ));

        let booking = manager
            .create_booking(&session, &request(&clinic, "auto", "2025-03-01T09:00"))
            .unwrap();

        assert!(matches!(
            manager.update_status(&session, booking.id, BookingStatus::Completed, None),
            Err(BookingError::InvalidTransition {
                from: BookingStatus::Pending,
                to: BookingStatus::Completed
            })
        ));

        // Stale client view
        manager
            .update_status(&session, booking.id, BookingStatus::Confirmed, Some(1))
            .unwrap();
        assert!(matches!(
            manager.update_status(&session, booking.id, BookingStatus::Cancelled, Some(1)),
            Err(BookingError::Conflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_customer_can_only_cancel_own_booking() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let customer = clinic.customer();

        let booking = manager
            .create_booking(&customer, &request(&clinic, "auto", "2025-03-01T09:00"))
            .unwrap();

        assert!(matches!(
            manager.update_status(&customer, booking.id, BookingStatus::Confirmed, None),
            Err(BookingError::Forbidden(_))
        ));

        let stranger = SessionContext::customer(300, clinic.customer_id + 1);
        assert!(matches!(
            manager.update_status(&stranger, booking.id, BookingStatus::Cancelled, None),
            Err(BookingError::Forbidden(_))
        ));

        let cancelled = manager
            .update_status(&customer, booking.id, BookingStatus::Cancelled, None)
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[test]
    fn test_edit_booking() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let session = clinic.reception();
        let booking = manager
            .create_booking(&session, &request(&clinic, "auto", "2025-03-01T09:00"))
            .unwrap();

        // Resending the current status is not a transition
        let edit = BookingEdit {
            doctor: Some(clinic.vet_id.to_string()),
            requested_at: Some("2025-03-01T10:00".into()),
            notes: Some("Bring vaccination book".into()),
            status: Some(BookingStatus::Pending),
            ..Default::default()
        };
        let edited = manager
            .edit_booking(&session, booking.id, &edit, Some(1))
            .unwrap();
        assert_eq!(edited.doctor_id, Some(clinic.vet_id));
        assert_eq!(edited.status, BookingStatus::Pending);
        assert_eq!(edited.notes.as_deref(), Some("Bring vaccination book"));
        assert_eq!(clinic_time::format_time_of_day(edited.requested_at), "10:00");

        let back_to_auto = BookingEdit {
            doctor: Some("auto".into()),
            status: Some(BookingStatus::Cancelled),
            ..Default::default()
        };
        let cancelled = manager
            .edit_booking(&session, booking.id, &back_to_auto, Some(2))
            .unwrap();
        assert_eq!(cancelled.doctor_id, None);
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        // Closed bookings are read-only
        let reopen = BookingEdit {
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        };
        assert!(matches!(
            manager.edit_booking(&session, booking.id, &reopen, None),
            Err(BookingError::InvalidTransition { .. })
        ));
        let notes_only = BookingEdit {
            notes: Some("late".into()),
            ..Default::default()
        };
        assert!(matches!(
            manager.edit_booking(&session, booking.id, &notes_only, None),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_check_in() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let session = clinic.reception();
        let booking = manager
            .create_booking(&session, &request(&clinic, "auto", "2025-03-01T09:00"))
            .unwrap();

        // Vets do not check customers in
        assert!(matches!(
            manager.check_in(&session, booking.id, clinic.vet_id),
            Err(BookingError::Forbidden(_))
        ));
        assert!(matches!(
            manager.check_in(&clinic.customer(), booking.id, clinic.reception_id),
            Err(BookingError::Forbidden(_))
        ));

        let checked_in = manager
            .check_in(&session, booking.id, clinic.reception_id)
            .unwrap();
        assert_eq!(checked_in.status, BookingStatus::Confirmed);

        assert!(matches!(
            manager.check_in(&session, booking.id, clinic.reception_id),
            Err(BookingError::InvalidTransition { .. })
        ));
    }
}
