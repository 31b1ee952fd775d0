//! Invoice service.
//!
//! Invoices have their own lifecycle (Pending → Paid | Cancelled) and are not
//! tied to a booking's status.

use chrono::Utc;
use thiserror::Error;

use crate::clinic_time;
use crate::db::{Database, DbError};
use crate::models::{Invoice, InvoiceStatus, Page, PageRequest, SessionContext};

/// Invoice errors.
#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Invalid invoice: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot change invoice status from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    #[error("Invoice {id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict { id: i64, expected: i64, actual: i64 },

    #[error("Not permitted: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

pub type InvoiceResult<T> = Result<T, InvoiceError>;

/// Billing operations over the local data store.
pub struct InvoiceService<'a> {
    db: &'a Database,
}

impl<'a> InvoiceService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create an invoice. It always starts Pending at version 1.
    pub fn create_invoice(&self, session: &SessionContext, invoice: &Invoice) -> InvoiceResult<Invoice> {
        self.require_branch(session, invoice.branch_id)?;
        if let Some(violation) = invoice.amount_violation() {
            return Err(InvoiceError::Validation(violation));
        }
        clinic_time::parse_date(&invoice.invoice_date)
            .map_err(|e| InvoiceError::Validation(e.to_string()))?;
        self.db
            .get_customer(invoice.customer_id)?
            .ok_or_else(|| InvoiceError::NotFound(format!("customer {}", invoice.customer_id)))?;
        self.db
            .get_branch(invoice.branch_id)?
            .ok_or_else(|| InvoiceError::NotFound(format!("branch {}", invoice.branch_id)))?;

        let mut created = Invoice {
            id: 0,
            status: InvoiceStatus::Pending,
            version: 1,
            ..invoice.clone()
        };
        created.id = self.db.insert_invoice(&created)?;

        tracing::info!(
            invoice_id = created.id,
            customer_id = created.customer_id,
            amount = created.effective_amount(),
            "Invoice created"
        );
        Ok(created)
    }

    pub fn get_invoice(&self, session: &SessionContext, id: i64) -> InvoiceResult<Invoice> {
        let invoice = self.load(id)?;
        match session.customer_id {
            Some(customer_id) if !session.role.is_staff() => {
                if invoice.customer_id != customer_id {
                    return Err(InvoiceError::Forbidden(format!("invoice {}", id)));
                }
            }
            _ => self.require_branch(session, invoice.branch_id)?,
        }
        Ok(invoice)
    }

    /// Invoices of a branch, newest first.
    pub fn list_invoices(&self, session: &SessionContext, branch_id: i64, page: PageRequest) -> InvoiceResult<Page<Invoice>> {
        self.require_branch(session, branch_id)?;
        Ok(self.db.list_invoices_for_branch(branch_id, page)?)
    }

    /// Move an invoice to `new_status` if the caller's view is current.
    pub fn update_status(
        &self,
        session: &SessionContext,
        id: i64,
        new_status: InvoiceStatus,
        expected_version: Option<i64>,
    ) -> InvoiceResult<Invoice> {
        let mut invoice = self.load(id)?;
        self.require_branch(session, invoice.branch_id)?;

        let expected = expected_version.unwrap_or(invoice.version);
        if expected != invoice.version {
            return Err(InvoiceError::Conflict {
                id,
                expected,
                actual: invoice.version,
            });
        }
        if !invoice.status.can_transition_to(new_status) {
            tracing::warn!(
                invoice_id = id,
                from = invoice.status.as_str(),
                to = new_status.as_str(),
                "Rejected invoice status change"
            );
            return Err(InvoiceError::InvalidTransition {
                from: invoice.status,
                to: new_status,
            });
        }

        if !self.db.update_invoice_status(id, new_status, expected)? {
            let actual = self.load(id)?.version;
            return Err(InvoiceError::Conflict {
                id,
                expected,
                actual,
            });
        }

        tracing::info!(
            invoice_id = id,
            from = invoice.status.as_str(),
            to = new_status.as_str(),
            at = %Utc::now().to_rfc3339(),
            "Invoice status changed"
        );
        invoice.status = new_status;
        invoice.version = expected + 1;
        Ok(invoice)
    }

    fn load(&self, id: i64) -> InvoiceResult<Invoice> {
        self.db
            .get_invoice(id)?
            .ok_or_else(|| InvoiceError::NotFound(format!("invoice {}", id)))
    }

    fn require_branch(&self, session: &SessionContext, branch_id: i64) -> InvoiceResult<()> {
        if session.covers_branch(branch_id) {
            Ok(())
        } else {
            Err(InvoiceError::Forbidden(format!(
                "branch {} is outside this session's scope",
                branch_id
            )))
        }
    }
}
