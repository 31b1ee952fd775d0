//! Clinic timezone handling.
//!
//! Every parse, calendar-day computation and display conversion goes through
//! this module so a booking never shows up on a different day depending on
//! where the code runs. The clinic operates in Asia/Ho_Chi_Minh, which is a
//! fixed UTC+07:00 with no daylight saving.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat,
    SubsecRound, TimeZone, Utc,
};
use thiserror::Error;

pub const CLINIC_TZ_NAME: &str = "Asia/Ho_Chi_Minh";

const CLINIC_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Accepted naive timestamp layouts, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Time parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),
}

pub type TimeResult<T> = Result<T, TimeError>;

/// The clinic's UTC offset.
pub fn clinic_offset() -> FixedOffset {
    FixedOffset::east_opt(CLINIC_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse a requested appointment time.
///
/// RFC 3339 values keep their own offset; naive values (`2025-03-01T09:00`)
/// are wall-clock times at the clinic. Fractional seconds are dropped, matching
/// the storage precision.
pub fn parse_timestamp(raw: &str) -> TimeResult<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(0));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .and_then(|naive| clinic_offset().from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc).trunc_subsecs(0))
        .ok_or_else(|| TimeError::InvalidTimestamp(raw.to_string()))
}

/// Parse an opaque `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> TimeResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| TimeError::InvalidDate(raw.to_string()))
}

/// UTC bounds `[start, end)` of a clinic calendar day.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = clinic_offset()
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    (start, start + Duration::days(1))
}

/// Calendar date of an instant, at the clinic.
pub fn clinic_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&clinic_offset()).date_naive()
}

/// Canonical storage form: `2025-03-01T02:00:00Z`.
///
/// Fixed width, so stored values order lexicographically.
pub fn to_storage(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn from_storage(raw: &str) -> TimeResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TimeError::InvalidTimestamp(raw.to_string()))
}

/// `dd/MM/yyyy HH:mm` at the clinic.
pub fn format_display(at: DateTime<Utc>) -> String {
    at.with_timezone(&clinic_offset())
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

/// `HH:MM` at the clinic.
pub fn format_time_of_day(at: DateTime<Utc>) -> String {
    at.with_timezone(&clinic_offset()).format("%H:%M").to_string()
}
