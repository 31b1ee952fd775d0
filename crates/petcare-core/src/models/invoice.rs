//! Invoice models.

use serde::{Deserialize, Serialize};

/// Amounts closer than this are considered equal.
pub const AMOUNT_EPSILON: f64 = 0.005;

/// Invoice status. Paid and Cancelled are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 3] = [
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvoiceStatus::Pending)
    }

    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Pending, InvoiceStatus::Paid)
                | (InvoiceStatus::Pending, InvoiceStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an invoice line bills for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LineItemRef {
    Product(i64),
    Service(i64),
}

impl LineItemRef {
    pub fn kind(&self) -> &'static str {
        match self {
            LineItemRef::Product(_) => "product",
            LineItemRef::Service(_) => "service",
        }
    }

    pub fn item_id(&self) -> i64 {
        match self {
            LineItemRef::Product(id) | LineItemRef::Service(id) => *id,
        }
    }
}

/// A single invoice line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLine {
    pub item: LineItemRef,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

impl InvoiceLine {
    /// Build a line with `total = quantity * unit_price`.
    pub fn new(item: LineItemRef, description: String, quantity: f64, unit_price: f64) -> Self {
        Self {
            item,
            description,
            quantity,
            unit_price,
            total: quantity * unit_price,
        }
    }

    pub fn is_consistent(&self) -> bool {
        (self.quantity * self.unit_price - self.total).abs() < AMOUNT_EPSILON
    }
}

/// A billing record; lifecycle independent from bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: i64,
    pub customer_id: i64,
    pub branch_id: i64,
    /// `YYYY-MM-DD`
    pub invoice_date: String,
    pub total_amount: f64,
    pub discount_amount: f64,
    /// Authoritative when present
    pub final_amount: Option<f64>,
    pub status: InvoiceStatus,
    pub lines: Vec<InvoiceLine>,
    pub version: i64,
}

impl Invoice {
    /// Amount the customer pays.
    pub fn effective_amount(&self) -> f64 {
        self.final_amount
            .unwrap_or(self.total_amount - self.discount_amount)
    }

    /// Sum of line totals.
    pub fn lines_total(&self) -> f64 {
        self.lines.iter().map(|line| line.total).sum()
    }

    /// Check the amount invariants, returning a description of the first violation.
    pub fn amount_violation(&self) -> Option<String> {
        if self.total_amount < 0.0 || self.discount_amount < 0.0 {
            return Some("amounts must not be negative".into());
        }
        if self.discount_amount > self.total_amount + AMOUNT_EPSILON {
            return Some("discount exceeds total".into());
        }
        if let Some(line) = self.lines.iter().find(|line| !line.is_consistent()) {
            return Some(format!(
                "line '{}' total {} != {} x {}",
                line.description, line.total, line.quantity, line.unit_price
            ));
        }
        if !self.lines.is_empty() && (self.lines_total() - self.total_amount).abs() >= AMOUNT_EPSILON {
            return Some(format!(
                "total {} does not match line items {}",
                self.total_amount,
                self.lines_total()
            ));
        }
        if let Some(final_amount) = self.final_amount {
            let expected = self.total_amount - self.discount_amount;
            if (final_amount - expected).abs() >= AMOUNT_EPSILON {
                return Some(format!(
                    "final amount {} != total {} - discount {}",
                    final_amount, self.total_amount, self.discount_amount
                ));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(total: f64, discount: f64, final_amount: Option<f64>) -> Invoice {
        Invoice {
            id: 0,
            customer_id: 1,
            branch_id: 1,
            invoice_date: "2025-03-01".into(),
            total_amount: total,
            discount_amount: discount,
            final_amount,
            status: InvoiceStatus::Pending,
            lines: vec![],
            version: 1,
        }
    }

    #[test]
    fn test_effective_amount_prefers_final() {
        assert_eq!(invoice(500.0, 50.0, Some(450.0)).effective_amount(), 450.0);
        assert_eq!(invoice(500.0, 50.0, None).effective_amount(), 450.0);
    }

    #[test]
    fn test_amount_violations() {
        assert!(invoice(500.0, 50.0, Some(450.0)).amount_violation().is_none());
        assert!(invoice(500.0, 50.0, Some(500.0)).amount_violation().is_some());
        assert!(invoice(100.0, 150.0, None).amount_violation().is_some());

        let mut with_lines = invoice(300.0, 0.0, None);
        with_lines.lines = vec![
            InvoiceLine::new(LineItemRef::Service(1), "Vaccination".into(), 1.0, 200.0),
            InvoiceLine::new(LineItemRef::Product(9), "Shampoo".into(), 2.0, 50.0),
        ];
        assert!(with_lines.amount_violation().is_none());

        with_lines.lines[1].total = 60.0;
        assert!(with_lines.amount_violation().is_some());
    }

    #[test]
    fn test_invoice_transitions() {
        assert!(InvoiceStatus::Pending.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));
        assert!(InvoiceStatus::Cancelled.is_terminal());
    }
}
