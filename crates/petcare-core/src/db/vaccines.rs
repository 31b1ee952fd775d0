//! Vaccination history database operations (append-only).

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::VaccineRecord;

impl Database {
    /// Append a vaccine record. Returns the id.
    pub fn insert_vaccine_record(&self, record: &VaccineRecord) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                INSERT INTO vaccine_records (
                    pet_id, vaccine_id, branch_id, doctor_id, dose,
                    date_administered, next_due_date, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                RETURNING id
                "#,
                params![
                    record.pet_id,
                    record.vaccine_id,
                    record.branch_id,
                    record.doctor_id,
                    record.dose,
                    record.date_administered,
                    record.next_due_date,
                    record.created_at,
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// A pet's vaccination history, most recent first.
    pub fn list_vaccine_records_for_pet(&self, pet_id: i64) -> DbResult<Vec<VaccineRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, pet_id, vaccine_id, branch_id, doctor_id, dose,
                   date_administered, next_due_date, created_at
            FROM vaccine_records
            WHERE pet_id = ?
            ORDER BY date_administered DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map([pet_id], |row| {
            Ok(VaccineRecord {
                id: row.get(0)?,
                pet_id: row.get(1)?,
                vaccine_id: row.get(2)?,
                branch_id: row.get(3)?,
                doctor_id: row.get(4)?,
                dose: row.get(5)?,
                date_administered: row.get(6)?,
                next_due_date: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Branch, Customer, Employee, Pet, Position};

    #[test]
    fn test_history_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let branch_id = db.upsert_branch(&Branch::new("District 1".into())).unwrap();
        let customer_id = db.upsert_customer(&Customer::new("An".into())).unwrap();
        let pet_id = db
            .upsert_pet(&Pet::new(customer_id, "Milo".into(), "canine".into()))
            .unwrap();
        let doctor_id = db
            .upsert_employee(&Employee::new(branch_id, "Dr. Minh".into(), Position::Veterinarian))
            .unwrap();

        for (dose, date) in [("1", "2025-01-10"), ("2", "2025-02-10")] {
            db.insert_vaccine_record(&VaccineRecord {
                id: 0,
                pet_id,
                vaccine_id: 3,
                branch_id,
                doctor_id,
                dose: dose.into(),
                date_administered: date.into(),
                next_due_date: None,
                created_at: chrono::Utc::now().to_rfc3339(),
            })
            .unwrap();
        }

        let history = db.list_vaccine_records_for_pet(pet_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].dose, "2");
        assert!(db.list_vaccine_records_for_pet(pet_id + 1).unwrap().is_empty());
    }
}
