//! End-to-end booking scenarios.

use std::time::{Duration, Instant};

use petcare_core::booking::{BookingError, BookingManager};
use petcare_core::clinic_time;
use petcare_core::db::Database;
use petcare_core::models::{
    Branch, BookingStatus, Customer, Employee, NewBooking, Pet, Position, Role, SessionContext,
};
use petcare_core::search::SearchController;
use petcare_core::{
    open_database_in_memory, FfiNewBooking, FfiSession, PetCareCore, PetCareError,
};

/// Branch 2 with doctor 5, customer 7 owning pet 3.
fn seeded() -> Database {
    let db = Database::open_in_memory().unwrap();
    let mut branch = Branch::new("District 7".to_string());
    branch.id = 2;
    db.upsert_branch(&branch).unwrap();

    let mut doctor = Employee::new(2, "Dr. Minh".to_string(), Position::Veterinarian);
    doctor.id = 5;
    db.upsert_employee(&doctor).unwrap();

    let mut customer = Customer::new("Pham Thi Mai".to_string());
    customer.id = 7;
    db.upsert_customer(&customer).unwrap();

    let mut pet = Pet::new(7, "Lucky".to_string(), "canine".to_string());
    pet.id = 3;
    db.upsert_pet(&pet).unwrap();
    db
}

fn reception() -> SessionContext {
    SessionContext::staff(Role::Reception, 11, 2)
}

fn request(doctor: &str, at: &str) -> NewBooking {
    NewBooking {
        customer_id: 7,
        pet_id: 3,
        branch_id: 2,
        doctor: doctor.to_string(),
        booking_type: "Checkup".to_string(),
        requested_at: at.to_string(),
        notes: None,
    }
}

#[test]
fn scenario_a_new_booking_is_pending_with_no_doctor() {
    let db = seeded();
    let manager = BookingManager::with_defaults(&db);
    let session = SessionContext::customer(70, 7);

    let booking = manager
        .create_booking(&session, &request("auto", "2025-03-01T09:00"))
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.doctor_id, None);
    assert_eq!(booking.customer_id, 7);
    assert_eq!(booking.pet_id, 3);
    assert_eq!(booking.branch_id, 2);
    assert_eq!(clinic_time::format_display(booking.requested_at), "01/03/2025 09:00");
}

#[test]
fn scenario_a_through_the_ffi_facade() {
    let core = open_database_in_memory().unwrap();
    core.import_branches(r#"{"items": [{"branchId": 2, "branchName": "District 7"}], "totalCount": 1}"#.into())
        .unwrap();
    core.import_customers(r#"[{"customerId": 7, "name": "Pham Thi Mai", "phoneNumber": "0903000111"}]"#.into())
        .unwrap();
    core.import_pets(r#"[{"petId": 3, "customerId": 7, "petName": "Lucky", "species": "canine"}]"#.into())
        .unwrap();

    let session = FfiSession {
        role: "customer".into(),
        user_id: 70,
        customer_id: Some(7),
        employee_id: None,
        branch_id: None,
    };
    let booking = core
        .create_booking(
            session,
            FfiNewBooking {
                customer_id: 7,
                pet_id: 3,
                branch_id: 2,
                doctor: "auto".into(),
                booking_type: "Checkup".into(),
                requested_at: "2025-03-01T09:00".into(),
                notes: None,
            },
        )
        .unwrap();

    assert_eq!(booking.status, "Pending");
    assert_eq!(booking.status_label, "Chờ xác nhận");
    assert_eq!(booking.doctor_id, None);
    assert_eq!(booking.requested_at, "2025-03-01T02:00:00Z");
}

#[test]
fn scenario_b_cancelled_booking_cannot_be_confirmed() {
    let db = seeded();
    let manager = BookingManager::with_defaults(&db);
    let session = reception();

    let booking = manager
        .create_booking(&session, &request("auto", "2025-03-01T09:00"))
        .unwrap();
    manager
        .update_status(&session, booking.id, BookingStatus::Cancelled, None)
        .unwrap();

    let err = manager
        .update_status(&session, booking.id, BookingStatus::Confirmed, None)
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::InvalidTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Confirmed
        }
    ));

    let stored = db.get_booking(booking.id).unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
}

#[test]
fn scenario_b_via_facade_reports_invalid_transition() {
    let core = open_database_in_memory().unwrap();
    core.import_branches(r#"[{"id": 2, "name": "District 7"}]"#.into()).unwrap();
    core.import_customers(r#"[{"id": 7, "fullName": "Pham Thi Mai"}]"#.into()).unwrap();
    core.import_pets(r#"[{"id": 3, "customerId": 7, "name": "Lucky"}]"#.into()).unwrap();
    core.import_bookings(
        r#"{"items": [{"bookingId": 40, "customerId": 7, "petId": 3, "branchId": 2,
            "serviceName": "Grooming", "appointmentDate": "2025-03-01T09:00", "status": "CANCELED"}]}"#
            .into(),
    )
    .unwrap();

    let session = FfiSession {
        role: "reception".into(),
        user_id: 11,
        customer_id: None,
        employee_id: Some(11),
        branch_id: Some(2),
    };
    let err = core
        .update_booking_status(session, 40, "Đã xác nhận".into(), None)
        .unwrap_err();
    assert!(matches!(err, PetCareError::InvalidTransition(_)));
}

#[test]
fn scenario_c_doctor_schedule_is_sorted_and_repeatable() {
    let db = seeded();
    let manager = BookingManager::with_defaults(&db);
    let session = reception();

    for at in ["2025-03-01T11:00", "2025-03-01T08:00", "2025-03-01T09:30"] {
        manager.create_booking(&session, &request("5", at)).unwrap();
    }
    // Another day, and a cancelled slot on the same day
    manager
        .create_booking(&session, &request("5", "2025-03-02T08:00"))
        .unwrap();
    let dropped = manager
        .create_booking(&session, &request("5", "2025-03-01T15:00"))
        .unwrap();
    manager
        .update_status(&session, dropped.id, BookingStatus::Cancelled, None)
        .unwrap();

    let first = manager.doctor_schedule(5, "2025-03-01").unwrap();
    let second = manager.doctor_schedule(5, "2025-03-01").unwrap();

    let times: Vec<&str> = first.iter().map(|e| e.local_time.as_str()).collect();
    assert_eq!(times, vec!["08:00", "09:30", "11:00"]);
    assert_eq!(first, second);
    assert!(first.iter().all(|e| e.pet_name == "Lucky"));
}

#[test]
fn scenario_d_upcoming_and_past_partition() {
    let db = seeded();
    let manager = BookingManager::with_defaults(&db);
    let now = clinic_time::parse_timestamp("2025-03-10T12:00").unwrap();

    for at in [
        "2025-02-01T09:00",
        "2025-03-01T09:00",
        "2025-03-10T11:59",
        "2025-03-10T12:30",
        "2025-04-01T09:00",
    ] {
        manager.create_booking(&reception(), &request("auto", at)).unwrap();
    }

    let split = manager
        .customer_bookings(&SessionContext::customer(70, 7), None, now)
        .unwrap();
    assert_eq!(split.upcoming.len(), 2);
    assert_eq!(split.past.len(), 3);
    assert!(split
        .upcoming
        .iter()
        .all(|u| split.past.iter().all(|p| p.id != u.id)));
    assert!(split.upcoming[0].requested_at < split.upcoming[1].requested_at);
    assert!(split.past[0].requested_at > split.past[2].requested_at);
}

#[test]
fn scenario_e_one_request_per_completed_pause() {
    let start = Instant::now();
    let mut search = SearchController::with_debounce(Duration::from_millis(400));
    let mut issued = Vec::new();

    // Type "a", pause 400ms, type "n", pause 400ms; the screen polls every 50ms
    let keystrokes = [(0u64, "a"), (400, "an")];
    let mut next_key = 0;
    for tick in (0..=1000u64).step_by(50) {
        let now = start + Duration::from_millis(tick);
        if let Some(ticket) = search.poll(now) {
            issued.push(ticket);
        }
        if next_key < keystrokes.len() && keystrokes[next_key].0 == tick {
            search.input(keystrokes[next_key].1, now);
            next_key += 1;
        }
    }

    let terms: Vec<&str> = issued.iter().map(|t| t.term.as_str()).collect();
    assert_eq!(terms, vec!["a", "an"]);
    assert!(!search.accept(&issued[0]));
    assert!(search.accept(&issued[1]));
}

#[test]
fn scenario_e_fast_typing_issues_a_single_request() {
    let start = Instant::now();
    let mut search = SearchController::with_debounce(Duration::from_millis(400));
    let mut issued = 0;

    for (i, term) in ["m", "mi", "mil", "milo"].iter().enumerate() {
        let at = start + Duration::from_millis(i as u64 * 120);
        search.input(term, at);
        if search.poll(at).is_some() {
            issued += 1;
        }
    }
    for tick in (400..=1500u64).step_by(100) {
        if search.poll(start + Duration::from_millis(tick)).is_some() {
            issued += 1;
        }
    }
    assert_eq!(issued, 1);
}

#[test]
fn stale_booking_edit_is_a_conflict() {
    let db = seeded();
    let manager = BookingManager::with_defaults(&db);
    let session = reception();
    let booking = manager
        .create_booking(&session, &request("auto", "2025-03-01T09:00"))
        .unwrap();

    // Two operators read version 1; the first write wins
    manager
        .update_status(&session, booking.id, BookingStatus::Confirmed, Some(booking.version))
        .unwrap();
    let err = manager
        .update_status(&session, booking.id, BookingStatus::Cancelled, Some(booking.version))
        .unwrap_err();
    assert!(matches!(err, BookingError::Conflict { .. }));
    assert!(!err.user_message(petcare_core::Language::English).is_empty());
}

/// Facade over branch 2, customers 7 and 8, pet 3 owned by 7 and pet 4 owned by 8.
fn seeded_core() -> std::sync::Arc<PetCareCore> {
    let core = open_database_in_memory().unwrap();
    core.import_branches(r#"[{"id": 2, "name": "District 7"}]"#.into()).unwrap();
    core.import_customers(r#"[{"id": 7, "fullName": "Pham Thi Mai"}, {"id": 8, "fullName": "Tran Van Binh"}]"#.into())
        .unwrap();
    core.import_pets(
        r#"[{"id": 3, "customerId": 7, "name": "Lucky"}, {"id": 4, "customerId": 8, "name": "Mun"}]"#.into(),
    )
    .unwrap();
    core
}

fn front_desk() -> FfiSession {
    FfiSession {
        role: "reception".into(),
        user_id: 11,
        customer_id: None,
        employee_id: Some(11),
        branch_id: Some(2),
    }
}

fn customer_bookings_of(core: &PetCareCore, customer_id: i64) -> Vec<i64> {
    let split = core.customer_bookings(front_desk(), Some(customer_id)).unwrap();
    split.upcoming.iter().chain(split.past.iter()).map(|b| b.id).collect()
}

#[test]
fn import_rejects_booking_for_another_customers_pet() {
    let core = seeded_core();

    let err = core
        .import_bookings(
            r#"[{"id": 20, "customerId": 7, "petId": 4, "branchId": 2,
                 "bookingType": "Checkup", "requestedDateTime": "2025-03-01T09:00"}]"#
                .into(),
        )
        .unwrap_err();
    assert!(matches!(err, PetCareError::InvalidInput(_)));
    assert!(customer_bookings_of(&core, 7).is_empty());
    assert!(customer_bookings_of(&core, 8).is_empty());
}

#[test]
fn failed_import_stores_nothing() {
    let core = seeded_core();

    let err = core
        .import_bookings(
            r#"[{"id": 10, "customerId": 7, "petId": 3, "branchId": 2,
                 "bookingType": "Checkup", "requestedDateTime": "2025-03-01T09:00"},
                {"id": 11, "customerId": 7, "petId": 3, "branchId": 99,
                 "bookingType": "Checkup", "requestedDateTime": "2025-03-01T10:00"}]"#
                .into(),
        )
        .unwrap_err();
    assert!(matches!(err, PetCareError::InvalidInput(_)));
    assert!(customer_bookings_of(&core, 7).is_empty());

    // A storage failure on the second record rolls back the first too
    let err = core
        .import_invoices(
            r#"[{"id": 1, "customerId": 7, "branchId": 2, "invoiceDate": "2025-03-01", "totalAmount": 100},
                {"id": 2, "customerId": 7, "branchId": 99, "invoiceDate": "2025-03-01", "totalAmount": 100}]"#
                .into(),
        )
        .unwrap_err();
    assert!(matches!(err, PetCareError::DatabaseError(_)));
    assert!(matches!(core.get_invoice(front_desk(), 1), Err(PetCareError::NotFound(_))));

    // The store is still usable afterwards
    assert_eq!(
        core.import_bookings(
            r#"[{"id": 10, "customerId": 7, "petId": 3, "branchId": 2,
                 "bookingType": "Checkup", "requestedDateTime": "2025-03-01T09:00"}]"#
                .into(),
        )
        .unwrap(),
        1
    );
    assert_eq!(customer_bookings_of(&core, 7), vec![10]);
}

#[test]
fn invoice_listing_reports_paging() {
    let core = seeded_core();
    core.import_invoices(
        r#"{"items": [
            {"id": 1, "customerId": 7, "branchId": 2, "invoiceDate": "2025-03-01T08:00:00", "totalAmount": 100, "status": "Paid"},
            {"id": 2, "customerId": 7, "branchId": 2, "invoiceDate": "2025-03-02", "totalAmount": 200},
            {"id": 3, "customerId": 8, "branchId": 2, "invoiceDate": "2025-03-03", "totalAmount": 300}
        ], "totalCount": 3}"#
            .into(),
    )
    .unwrap();

    let first = core.list_invoices(front_desk(), 2, 1, Some(2)).unwrap();
    assert_eq!(first.total_count, 3);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.page, 1);
    assert_eq!(first.page_size, 2);
    let ids: Vec<i64> = first.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![3, 2]);

    let second = core.list_invoices(front_desk(), 2, 2, Some(2)).unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].id, 1);
    assert_eq!(second.items[0].status, "Paid");
}
