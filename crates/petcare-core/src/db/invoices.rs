//! Invoice database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{assigned_id, Database, DbError, DbResult};
use crate::models::{Invoice, InvoiceLine, InvoiceStatus, LineItemRef, Page, PageRequest};

impl Database {
    /// Insert an invoice with its lines in one transaction. Returns the id.
    pub fn insert_invoice(&self, invoice: &Invoice) -> DbResult<i64> {
        self.atomically(|| -> DbResult<i64> {
            let id: i64 = self.conn.query_row(
                r#"
                INSERT INTO invoices (
                    id, customer_id, branch_id, invoice_date, total_amount,
                    discount_amount, final_amount, status, version
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                RETURNING id
                "#,
                params![
                    assigned_id(invoice.id),
                    invoice.customer_id,
                    invoice.branch_id,
                    invoice.invoice_date,
                    invoice.total_amount,
                    invoice.discount_amount,
                    invoice.final_amount,
                    invoice.status.as_str(),
                    invoice.version,
                ],
                |row| row.get(0),
            )?;
            self.write_invoice_lines(id, &invoice.lines)?;
            Ok(id)
        })
    }

    /// Insert or overwrite an invoice imported from the backend, replacing its lines.
    pub fn upsert_invoice(&self, invoice: &Invoice) -> DbResult<i64> {
        self.atomically(|| -> DbResult<i64> {
            let id: i64 = self.conn.query_row(
                r#"
                INSERT INTO invoices (
                    id, customer_id, branch_id, invoice_date, total_amount,
                    discount_amount, final_amount, status, version
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO UPDATE SET
                    customer_id = excluded.customer_id,
                    branch_id = excluded.branch_id,
                    invoice_date = excluded.invoice_date,
                    total_amount = excluded.total_amount,
                    discount_amount = excluded.discount_amount,
                    final_amount = excluded.final_amount,
                    status = excluded.status,
                    version = invoices.version + 1
                RETURNING id
                "#,
                params![
                    assigned_id(invoice.id),
                    invoice.customer_id,
                    invoice.branch_id,
                    invoice.invoice_date,
                    invoice.total_amount,
                    invoice.discount_amount,
                    invoice.final_amount,
                    invoice.status.as_str(),
                    invoice.version,
                ],
                |row| row.get(0),
            )?;
            self.conn
                .execute("DELETE FROM invoice_lines WHERE invoice_id = ?", [id])?;
            self.write_invoice_lines(id, &invoice.lines)?;
            Ok(id)
        })
    }

    fn write_invoice_lines(&self, invoice_id: i64, lines: &[InvoiceLine]) -> DbResult<()> {
        let mut stmt = self.conn.prepare(
            r#"
            INSERT INTO invoice_lines (
                invoice_id, line_no, item_kind, item_id, description,
                quantity, unit_price, total
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )?;
        for (line_no, line) in lines.iter().enumerate() {
            stmt.execute(params![
                invoice_id,
                line_no as i64,
                line.item.kind(),
                line.item.item_id(),
                line.description,
                line.quantity,
                line.unit_price,
                line.total,
            ])?;
        }
        Ok(())
    }

    /// Get an invoice with its lines.
    pub fn get_invoice(&self, id: i64) -> DbResult<Option<Invoice>> {
        let header = self
            .conn
            .query_row(
                r#"
                SELECT id, customer_id, branch_id, invoice_date, total_amount,
                       discount_amount, final_amount, status, version
                FROM invoices
                WHERE id = ?
                "#,
                [id],
                InvoiceRow::from_row,
            )
            .optional()?;

        match header {
            Some(row) => {
                let lines = self.list_invoice_lines(row.id)?;
                Ok(Some(row.into_invoice(lines)?))
            }
            None => Ok(None),
        }
    }

    /// Invoices of a branch, newest first.
    pub fn list_invoices_for_branch(&self, branch_id: i64, page: PageRequest) -> DbResult<Page<Invoice>> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE branch_id = ?",
            [branch_id],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, customer_id, branch_id, invoice_date, total_amount,
                   discount_amount, final_amount, status, version
            FROM invoices
            WHERE branch_id = ?1
            ORDER BY invoice_date DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(
            params![branch_id, page.limit(), page.offset()],
            InvoiceRow::from_row,
        )?;

        let mut items = Vec::new();
        for row in rows {
            let row = row?;
            let lines = self.list_invoice_lines(row.id)?;
            items.push(row.into_invoice(lines)?);
        }
        Ok(Page::new(items, total.max(0) as u64, page))
    }

    /// Set the invoice status if the stored version still matches.
    pub fn update_invoice_status(
        &self,
        id: i64,
        status: InvoiceStatus,
        expected_version: i64,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE invoices SET status = ?1, version = version + 1 WHERE id = ?2 AND version = ?3",
            params![status.as_str(), id, expected_version],
        )?;
        Ok(rows_affected > 0)
    }

    fn list_invoice_lines(&self, invoice_id: i64) -> DbResult<Vec<InvoiceLine>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT item_kind, item_id, description, quantity, unit_price, total
            FROM invoice_lines
            WHERE invoice_id = ?
            ORDER BY line_no
            "#,
        )?;
        let rows = stmt.query_map([invoice_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut lines = Vec::new();
        for row in rows {
            let (kind, item_id, description, quantity, unit_price, total) = row?;
            let item = match kind.as_str() {
                "product" => LineItemRef::Product(item_id),
                "service" => LineItemRef::Service(item_id),
                other => {
                    return Err(DbError::Constraint(format!("Unknown line item kind: {}", other)))
                }
            };
            lines.push(InvoiceLine {
                item,
                description,
                quantity,
                unit_price,
                total,
            });
        }
        Ok(lines)
    }
}

/// Intermediate row struct for database mapping.
struct InvoiceRow {
    id: i64,
    customer_id: i64,
    branch_id: i64,
    invoice_date: String,
    total_amount: f64,
    discount_amount: f64,
    final_amount: Option<f64>,
    status: String,
    version: i64,
}

impl InvoiceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            customer_id: row.get(1)?,
            branch_id: row.get(2)?,
            invoice_date: row.get(3)?,
            total_amount: row.get(4)?,
            discount_amount: row.get(5)?,
            final_amount: row.get(6)?,
            status: row.get(7)?,
            version: row.get(8)?,
        })
    }

    fn into_invoice(self, lines: Vec<InvoiceLine>) -> DbResult<Invoice> {
        let status = InvoiceStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == self.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown invoice status: {}", self.status)))?;
        Ok(Invoice {
            id: self.id,
            customer_id: self.customer_id,
            branch_id: self.branch_id,
            invoice_date: self.invoice_date,
            total_amount: self.total_amount,
            discount_amount: self.discount_amount,
            final_amount: self.final_amount,
            status,
            lines,
            version: self.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Branch, Customer};

    fn setup_db() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let branch_id = db.upsert_branch(&Branch::new("District 1".into())).unwrap();
        let customer_id = db.upsert_customer(&Customer::new("An".into())).unwrap();
        (db, branch_id, customer_id)
    }

    fn make_invoice(customer_id: i64, branch_id: i64, date: &str) -> Invoice {
        Invoice {
            id: 0,
            customer_id,
            branch_id,
            invoice_date: date.into(),
            total_amount: 300.0,
            discount_amount: 30.0,
            final_amount: Some(270.0),
            status: InvoiceStatus::Pending,
            lines: vec![
                InvoiceLine::new(LineItemRef::Service(1), "Checkup".into(), 1.0, 200.0),
                InvoiceLine::new(LineItemRef::Product(7), "Deworming tablet".into(), 2.0, 50.0),
            ],
            version: 1,
        }
    }

    #[test]
    fn test_insert_and_get_invoice() {
        let (db, branch_id, customer_id) = setup_db();
        let id = db
            .insert_invoice(&make_invoice(customer_id, branch_id, "2025-03-01"))
            .unwrap();

        let invoice = db.get_invoice(id).unwrap().unwrap();
        assert_eq!(invoice.lines.len(), 2);
        assert_eq!(invoice.lines[1].item, LineItemRef::Product(7));
        assert_eq!(invoice.effective_amount(), 270.0);
        assert!(db.get_invoice(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let (db, branch_id, customer_id) = setup_db();
        let older = db
            .insert_invoice(&make_invoice(customer_id, branch_id, "2025-02-01"))
            .unwrap();
        let newer = db
            .insert_invoice(&make_invoice(customer_id, branch_id, "2025-03-01"))
            .unwrap();

        let page = db
            .list_invoices_for_branch(branch_id, PageRequest::new(1, 10, 100))
            .unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items[0].id, newer);
        assert_eq!(page.items[1].id, older);
    }

    #[test]
    fn test_upsert_replaces_lines() {
        let (db, branch_id, customer_id) = setup_db();
        let mut invoice = make_invoice(customer_id, branch_id, "2025-03-01");
        invoice.id = 40;
        assert_eq!(db.upsert_invoice(&invoice).unwrap(), 40);

        invoice.lines.truncate(1);
        invoice.status = InvoiceStatus::Paid;
        db.upsert_invoice(&invoice).unwrap();

        let stored = db.get_invoice(40).unwrap().unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert_eq!(stored.status, InvoiceStatus::Paid);
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn test_status_update_checks_version() {
        let (db, branch_id, customer_id) = setup_db();
        let id = db
            .insert_invoice(&make_invoice(customer_id, branch_id, "2025-03-01"))
            .unwrap();

        assert!(db.update_invoice_status(id, InvoiceStatus::Paid, 1).unwrap());
        assert!(!db.update_invoice_status(id, InvoiceStatus::Cancelled, 1).unwrap());

        let invoice = db.get_invoice(id).unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.version, 2);
    }
}
