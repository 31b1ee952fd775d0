//! Role-scoped booking reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingError, BookingManager, BookingResult};
use crate::clinic_time;
use crate::db::BookingFilter;
use crate::models::{BookingStatus, BookingSummary, CustomerBookings, Page, PageRequest, Role, SessionContext};

/// Filters a list screen sends.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingQuery {
    /// Only admins may pick a branch; other staff are pinned to their own
    pub branch_id: Option<i64>,
    pub status: Option<BookingStatus>,
    /// `YYYY-MM-DD`, clinic calendar day
    pub date: Option<String>,
    pub search: Option<String>,
}

impl<'a> BookingManager<'a> {
    /// A customer's bookings split into upcoming and past around `now`.
    ///
    /// Customer sessions always read their own bookings; `customer_id` only
    /// matters for staff.
    pub fn customer_bookings(
        &self,
        session: &SessionContext,
        customer_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> BookingResult<CustomerBookings> {
        let customer_id = match session.role {
            Role::Customer => {
                let own = session.require_customer()?;
                if customer_id.is_some_and(|requested| requested != own) {
                    return Err(BookingError::Forbidden(
                        "customers can only view their own bookings".into(),
                    ));
                }
                own
            }
            _ => customer_id
                .ok_or_else(|| BookingError::Validation("customer id is required".into()))?,
        };

        let mut bookings = self.db.list_bookings_for_customer(customer_id)?;
        if session.role != Role::Customer && session.role != Role::Admin {
            bookings.retain(|b| session.covers_branch(b.branch_id));
        }

        let split = CustomerBookings::split(bookings, now);
        tracing::debug!(
            customer_id,
            upcoming = split.upcoming.len(),
            past = split.past.len(),
            "Loaded customer bookings"
        );
        Ok(split)
    }

    /// One page of bookings for a staff list screen.
    pub fn list_bookings(
        &self,
        session: &SessionContext,
        query: &BookingQuery,
        page: PageRequest,
    ) -> BookingResult<Page<BookingSummary>> {
        let branch_id = match session.role {
            Role::Customer => {
                return Err(BookingError::Forbidden("staff session required".into()));
            }
            Role::Admin => query.branch_id,
            _ => {
                let own = session.require_branch()?;
                if let Some(requested) = query.branch_id.filter(|requested| *requested != own) {
                    return Err(BookingError::Forbidden(format!(
                        "branch {} is outside this session's scope",
                        requested
                    )));
                }
                Some(own)
            }
        };

        let date = query.date.as_deref().map(clinic_time::parse_date).transpose()?;
        let filter = BookingFilter {
            branch_id,
            status: query.status,
            date,
            search: query.search.clone(),
            ..Default::default()
        };

        let result = self.db.list_bookings(&filter, page)?;
        tracing::debug!(
            branch_id = ?branch_id,
            page = result.page,
            total = result.total_count,
            "Listed bookings"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::test_support::Clinic;
    use crate::models::{Customer, NewBooking};

    fn book(clinic: &Clinic, manager: &BookingManager<'_>, customer_id: i64, pet_id: i64, at: &str) -> i64 {
        manager
            .create_booking(
                &clinic.reception(),
                &NewBooking {
                    customer_id,
                    pet_id,
                    branch_id: clinic.branch_id,
                    doctor: "auto".into(),
                    booking_type: "Checkup".into(),
                    requested_at: at.into(),
                    notes: None,
                },
            )
            .unwrap()
            .id
    }

    #[test]
    fn test_customer_bookings_split() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let now = clinic_time::parse_timestamp("2025-03-01T12:00").unwrap();

        let past = book(&clinic, &manager, clinic.customer_id, clinic.pet_id, "2025-02-01T09:00");
        let soon = book(&clinic, &manager, clinic.customer_id, clinic.pet_id, "2025-03-02T09:00");
        let at_now = book(&clinic, &manager, clinic.customer_id, clinic.pet_id, "2025-03-01T12:00");

        let split = manager
            .customer_bookings(&clinic.customer(), None, now)
            .unwrap();
        let upcoming: Vec<i64> = split.upcoming.iter().map(|b| b.id).collect();
        assert_eq!(upcoming, vec![at_now, soon]);
        assert_eq!(split.past.len(), 1);
        assert_eq!(split.past[0].id, past);
    }

    #[test]
    fn test_customer_cannot_read_others() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        let err = manager
            .customer_bookings(&clinic.customer(), Some(clinic.customer_id + 1), Utc::now())
            .unwrap_err();
        assert!(matches!(err, BookingError::Forbidden(_)));

        assert!(matches!(
            manager.customer_bookings(&clinic.reception(), None, Utc::now()),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_list_bookings_filters_and_scope() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);

        let mut other = Customer::new("Tran Binh".into());
        other.phone = Some("0988777666".into());
        let other_id = clinic.db.upsert_customer(&other).unwrap();
        let other_pet = clinic.add_pet(other_id, "Bông");

        book(&clinic, &manager, clinic.customer_id, clinic.pet_id, "2025-03-01T09:00");
        book(&clinic, &manager, other_id, other_pet, "2025-03-01T10:00");
        book(&clinic, &manager, clinic.customer_id, clinic.pet_id, "2025-03-02T09:00");

        let session = clinic.reception();
        let all = manager
            .list_bookings(&session, &BookingQuery::default(), PageRequest::new(1, 10, 100))
            .unwrap();
        assert_eq!(all.total_count, 3);

        let by_day = BookingQuery {
            date: Some("2025-03-01".into()),
            ..Default::default()
        };
        let page = manager
            .list_bookings(&session, &by_day, PageRequest::new(1, 10, 100))
            .unwrap();
        assert_eq!(page.total_count, 2);

        let by_phone = BookingQuery {
            search: Some("8777".into()),
            ..Default::default()
        };
        let page = manager
            .list_bookings(&session, &by_phone, PageRequest::new(1, 10, 100))
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].pet_name, "Bông");

        let by_name = BookingQuery {
            search: Some("NGUYEN".into()),
            status: Some(BookingStatus::Pending),
            ..Default::default()
        };
        let page = manager
            .list_bookings(&session, &by_name, PageRequest::new(1, 10, 100))
            .unwrap();
        assert_eq!(page.total_count, 2);

        let elsewhere = BookingQuery {
            branch_id: Some(clinic.other_branch_id),
            ..Default::default()
        };
        assert!(matches!(
            manager.list_bookings(&session, &elsewhere, PageRequest::new(1, 10, 100)),
            Err(BookingError::Forbidden(_))
        ));
        assert!(matches!(
            manager.list_bookings(&clinic.customer(), &BookingQuery::default(), PageRequest::new(1, 10, 100)),
            Err(BookingError::Forbidden(_))
        ));

        let admin = SessionContext::staff(Role::Admin, 1, clinic.branch_id);
        let page = manager
            .list_bookings(&admin, &elsewhere, PageRequest::new(1, 10, 100))
            .unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_list_bookings_pages_stably() {
        let clinic = Clinic::new();
        let manager = BookingManager::with_defaults(&clinic.db);
        for day in 1..=5 {
            book(
                &clinic,
                &manager,
                clinic.customer_id,
                clinic.pet_id,
                &format!("2025-03-0{}T09:00", day),
            );
        }

        let session = clinic.reception();
        let first = manager
            .list_bookings(&session, &BookingQuery::default(), PageRequest::new(1, 2, 100))
            .unwrap();
        let last = manager
            .list_bookings(&session, &BookingQuery::default(), PageRequest::new(3, 2, 100))
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total_pages(), 3);
        assert!(first.has_next());
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_next());
        assert!(first.items[1].booking.requested_at < last.items[0].booking.requested_at);
    }
}
