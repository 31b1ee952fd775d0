//! Shared status label table.
//!
//! Every screen renders and parses statuses through this one table instead of
//! keeping its own English/Vietnamese mapping.

use super::booking::BookingStatus;
use super::invoice::InvoiceStatus;

/// Display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    English,
    #[default]
    Vietnamese,
}

/// (status, English label, Vietnamese label)
const BOOKING_LABELS: &[(BookingStatus, &str, &str)] = &[
    (BookingStatus::Pending, "Pending", "Chờ xác nhận"),
    (BookingStatus::Confirmed, "Confirmed", "Đã xác nhận"),
    (BookingStatus::Completed, "Completed", "Hoàn thành"),
    (BookingStatus::Cancelled, "Cancelled", "Đã hủy"),
];

/// Extra spellings seen in stored data and older screens (lowercase).
const BOOKING_ALIASES: &[(&str, BookingStatus)] = &[
    ("waiting", BookingStatus::Pending),
    ("đang chờ", BookingStatus::Pending),
    ("chờ duyệt", BookingStatus::Pending),
    ("checked in", BookingStatus::Confirmed),
    ("checkedin", BookingStatus::Confirmed),
    ("đã check-in", BookingStatus::Confirmed),
    ("done", BookingStatus::Completed),
    ("đã hoàn thành", BookingStatus::Completed),
    ("canceled", BookingStatus::Cancelled),
    ("đã huỷ", BookingStatus::Cancelled),
    ("hủy", BookingStatus::Cancelled),
    ("huỷ", BookingStatus::Cancelled),
];

const INVOICE_LABELS: &[(InvoiceStatus, &str, &str)] = &[
    (InvoiceStatus::Pending, "Pending", "Chờ thanh toán"),
    (InvoiceStatus::Paid, "Paid", "Đã thanh toán"),
    (InvoiceStatus::Cancelled, "Cancelled", "Đã hủy"),
];

const INVOICE_ALIASES: &[(&str, InvoiceStatus)] = &[
    ("unpaid", InvoiceStatus::Pending),
    ("chưa thanh toán", InvoiceStatus::Pending),
    ("canceled", InvoiceStatus::Cancelled),
    ("đã huỷ", InvoiceStatus::Cancelled),
];

/// A status with display labels.
pub trait StatusLabel: Sized + Copy + PartialEq + 'static {
    fn label_table() -> &'static [(Self, &'static str, &'static str)];
    fn alias_table() -> &'static [(&'static str, Self)];

    /// Display label in `language`.
    fn label(&self, language: Language) -> &'static str {
        Self::label_table()
            .iter()
            .find(|(status, _, _)| status == self)
            .map(|(_, en, vi)| match language {
                Language::English => *en,
                Language::Vietnamese => *vi,
            })
            .unwrap_or("")
    }

    /// Resolve any known spelling (any case, either language) to the canonical status.
    fn parse_label(raw: &str) -> Option<Self> {
        let key = normalize_label(raw);
        if key.is_empty() {
            return None;
        }
        Self::label_table()
            .iter()
            .find(|(_, en, vi)| normalize_label(en) == key || normalize_label(vi) == key)
            .map(|(status, _, _)| *status)
            .or_else(|| {
                Self::alias_table()
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .map(|(_, status)| *status)
            })
    }
}

impl StatusLabel for BookingStatus {
    fn label_table() -> &'static [(Self, &'static str, &'static str)] {
        BOOKING_LABELS
    }

    fn alias_table() -> &'static [(&'static str, Self)] {
        BOOKING_ALIASES
    }
}

impl StatusLabel for InvoiceStatus {
    fn label_table() -> &'static [(Self, &'static str, &'static str)] {
        INVOICE_LABELS
    }

    fn alias_table() -> &'static [(&'static str, Self)] {
        INVOICE_ALIASES
    }
}

/// Lowercase, trim, and fold `_` into spaces.
fn normalize_label(raw: &str) -> String {
    raw.trim().replace('_', " ").to_lowercase()
}
