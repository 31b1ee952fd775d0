//! Booking database operations.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{assigned_id, like_pattern, Database, DbError, DbResult};
use crate::clinic_time;
use crate::models::{Booking, BookingStatus, BookingSummary, Page, PageRequest, ScheduleEntry};

const BOOKING_COLUMNS: &str = r#"
    b.id, b.customer_id, b.pet_id, b.branch_id, b.doctor_id, b.booking_type,
    b.requested_at, b.status, b.notes, b.version, b.created_at, b.updated_at
"#;

/// Every parameter is optional; `NULL` disables that clause.
/// ?1 branch, ?2 customer, ?3 doctor, ?4 status, ?5/?6 day bounds, ?7 search pattern
const BOOKING_FILTER: &str = r#"
    (?1 IS NULL OR b.branch_id = ?1)
    AND (?2 IS NULL OR b.customer_id = ?2)
    AND (?3 IS NULL OR b.doctor_id = ?3)
    AND (?4 IS NULL OR b.status = ?4)
    AND (?5 IS NULL OR (b.requested_at >= ?5 AND b.requested_at < ?6))
    AND (?7 IS NULL
         OR fold_case(c.full_name) LIKE ?7 ESCAPE '\'
         OR fold_case(p.name) LIKE ?7 ESCAPE '\'
         OR c.phone LIKE ?7 ESCAPE '\')
"#;

/// Filters for staff booking lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub branch_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub status: Option<BookingStatus>,
    /// Clinic calendar day
    pub date: Option<NaiveDate>,
    /// Matches customer name, pet name or phone
    pub search: Option<String>,
}

impl BookingFilter {
    fn sql_values(&self) -> Vec<Value> {
        let (day_start, day_end) = match self.date {
            Some(date) => {
                let (start, end) = clinic_time::day_bounds(date);
                (
                    Value::Text(clinic_time::to_storage(start)),
                    Value::Text(clinic_time::to_storage(end)),
                )
            }
            None => (Value::Null, Value::Null),
        };
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::Text(like_pattern(s)))
            .unwrap_or(Value::Null);

        vec![
            self.branch_id.map(Value::Integer).unwrap_or(Value::Null),
            self.customer_id.map(Value::Integer).unwrap_or(Value::Null),
            self.doctor_id.map(Value::Integer).unwrap_or(Value::Null),
            self.status
                .map(|s| Value::Text(s.as_str().to_string()))
                .unwrap_or(Value::Null),
            day_start,
            day_end,
            search,
        ]
    }
}

impl Database {
    /// Insert a new booking. Returns the id.
    pub fn insert_booking(&self, booking: &Booking) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                INSERT INTO bookings (
                    id, customer_id, pet_id, branch_id, doctor_id, booking_type,
                    requested_at, status, notes, version, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                RETURNING id
                "#,
                params![
                    assigned_id(booking.id),
                    booking.customer_id,
                    booking.pet_id,
                    booking.branch_id,
                    booking.doctor_id,
                    booking.booking_type,
                    clinic_time::to_storage(booking.requested_at),
                    booking.status.as_str(),
                    booking.notes,
                    booking.version,
                    booking.created_at,
                    booking.updated_at,
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Insert or overwrite a booking imported from the backend.
    ///
    /// An overwrite counts as a write, so the local version moves on.
    pub fn upsert_booking(&self, booking: &Booking) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                INSERT INTO bookings (
                    id, customer_id, pet_id, branch_id, doctor_id, booking_type,
                    requested_at, status, notes, version, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(id) DO UPDATE SET
                    customer_id = excluded.customer_id,
                    pet_id = excluded.pet_id,
                    branch_id = excluded.branch_id,
                    doctor_id = excluded.doctor_id,
                    booking_type = excluded.booking_type,
                    requested_at = excluded.requested_at,
                    status = excluded.status,
                    notes = excluded.notes,
                    version = bookings.version + 1,
                    updated_at = excluded.updated_at
                RETURNING id
                "#,
                params![
                    assigned_id(booking.id),
                    booking.customer_id,
                    booking.pet_id,
                    booking.branch_id,
                    booking.doctor_id,
                    booking.booking_type,
                    clinic_time::to_storage(booking.requested_at),
                    booking.status.as_str(),
                    booking.notes,
                    booking.version,
                    booking.created_at,
                    booking.updated_at,
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Get a booking by ID.
    pub fn get_booking(&self, id: i64) -> DbResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings b WHERE b.id = ?", BOOKING_COLUMNS);
        self.conn
            .query_row(&sql, [id], BookingRow::from_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Write a booking back if nobody else wrote it since `expected_version`.
    ///
    /// Returns false when the id is unknown or the version is stale; the stored
    /// version is bumped on success.
    pub fn update_booking(&self, booking: &Booking, expected_version: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE bookings SET
                doctor_id = ?3,
                booking_type = ?4,
                requested_at = ?5,
                status = ?6,
                notes = ?7,
                version = version + 1,
                updated_at = ?8
            WHERE id = ?1 AND version = ?2
            "#,
            params![
                booking.id,
                expected_version,
                booking.doctor_id,
                booking.booking_type,
                clinic_time::to_storage(booking.requested_at),
                booking.status.as_str(),
                booking.notes,
                booking.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// One page of bookings with the names staff screens search on.
    ///
    /// Ordered by requested time then id, so repeated reads page identically.
    pub fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> DbResult<Page<BookingSummary>> {
        let values = filter.sql_values();

        let count_sql = format!(
            r#"
            SELECT COUNT(*)
            FROM bookings b
            JOIN customers c ON c.id = b.customer_id
            JOIN pets p ON p.id = b.pet_id
            WHERE {}
            "#,
            BOOKING_FILTER
        );
        let total: i64 = self
            .conn
            .query_row(&count_sql, params_from_iter(values.iter()), |row| row.get(0))?;

        let list_sql = format!(
            r#"
            SELECT {}, c.full_name, c.phone, p.name, e.full_name
            FROM bookings b
            JOIN customers c ON c.id = b.customer_id
            JOIN pets p ON p.id = b.pet_id
            LEFT JOIN employees e ON e.id = b.doctor_id
            WHERE {}
            ORDER BY b.requested_at ASC, b.id ASC
            LIMIT ?8 OFFSET ?9
            "#,
            BOOKING_COLUMNS, BOOKING_FILTER
        );
        let mut list_values = values;
        list_values.push(Value::Integer(page.limit()));
        list_values.push(Value::Integer(page.offset()));

        let mut stmt = self.conn.prepare(&list_sql)?;
        let rows = stmt.query_map(params_from_iter(list_values.iter()), |row| {
            Ok((
                BookingRow::from_row(row)?,
                row.get::<_, String>(12)?,
                row.get::<_, Option<String>>(13)?,
                row.get::<_, String>(14)?,
                row.get::<_, Option<String>>(15)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (booking_row, customer_name, customer_phone, pet_name, doctor_name) = row?;
            items.push(BookingSummary {
                booking: booking_row.try_into()?,
                customer_name,
                customer_phone,
                pet_name,
                doctor_name,
            });
        }

        Ok(Page::new(items, total.max(0) as u64, page))
    }

    /// All bookings of one customer, oldest first.
    pub fn list_bookings_for_customer(&self, customer_id: i64) -> DbResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings b WHERE b.customer_id = ? ORDER BY b.requested_at, b.id",
            BOOKING_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([customer_id], BookingRow::from_row)?;

        let mut bookings = Vec::new();
        for row in rows {
            bookings.push(row?.try_into()?);
        }
        Ok(bookings)
    }

    /// Non-cancelled bookings of a doctor on one clinic calendar day.
    pub fn list_doctor_day(&self, doctor_id: i64, date: NaiveDate) -> DbResult<Vec<ScheduleEntry>> {
        let (start, end) = clinic_time::day_bounds(date);
        let mut stmt = self.conn.prepare(
            r#"
            SELECT b.id, b.requested_at, p.name, b.booking_type, b.status
            FROM bookings b
            JOIN pets p ON p.id = b.pet_id
            WHERE b.doctor_id = ?1
              AND b.requested_at >= ?2 AND b.requested_at < ?3
              AND b.status != 'Cancelled'
            ORDER BY b.requested_at ASC, b.id ASC
            "#,
        )?;
        let rows = stmt.query_map(
            params![
                doctor_id,
                clinic_time::to_storage(start),
                clinic_time::to_storage(end)
            ],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )?;

        let mut entries = Vec::new();
        for row in rows {
            let (booking_id, requested_at, pet_name, activity, status) = row?;
            let appointment_time = clinic_time::from_storage(&requested_at)?;
            entries.push(ScheduleEntry {
                booking_id,
                appointment_time,
                local_time: clinic_time::format_time_of_day(appointment_time),
                pet_name,
                activity,
                status: parse_status(&status)?,
            });
        }
        Ok(entries)
    }

    /// Count a doctor's non-cancelled bookings strictly inside `(after, before)`.
    pub fn count_doctor_bookings_between(
        &self,
        doctor_id: i64,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
        exclude_booking: Option<i64>,
    ) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                SELECT COUNT(*)
                FROM bookings
                WHERE doctor_id = ?1
                  AND requested_at > ?2 AND requested_at < ?3
                  AND status != 'Cancelled'
                  AND (?4 IS NULL OR id != ?4)
                "#,
                params![
                    doctor_id,
                    clinic_time::to_storage(after),
                    clinic_time::to_storage(before),
                    exclude_booking,
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

/// Intermediate row struct for database mapping.
struct BookingRow {
    id: i64,
    customer_id: i64,
    pet_id: i64,
    branch_id: i64,
    doctor_id: Option<i64>,
    booking_type: String,
    requested_at: String,
    status: String,
    notes: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl BookingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            customer_id: row.get(1)?,
            pet_id: row.get(2)?,
            branch_id: row.get(3)?,
            doctor_id: row.get(4)?,
            booking_type: row.get(5)?,
            requested_at: row.get(6)?,
            status: row.get(7)?,
            notes: row.get(8)?,
            version: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            customer_id: row.customer_id,
            pet_id: row.pet_id,
            branch_id: row.branch_id,
            doctor_id: row.doctor_id,
            booking_type: row.booking_type,
            requested_at: clinic_time::from_storage(&row.requested_at)?,
            status: parse_status(&row.status)?,
            notes: row.notes,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_status(s: &str) -> Result<BookingStatus, DbError> {
    BookingStatus::ALL
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| DbError::Constraint(format!("Unknown booking status: {}", s)))
}
