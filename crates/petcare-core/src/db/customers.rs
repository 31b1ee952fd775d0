//! Customer and pet database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{assigned_id, Database, DbResult};
use crate::models::{Customer, MembershipTier, Pet};

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    let tier: String = row.get(4)?;
    Ok(Customer {
        id: row.get(0)?,
        full_name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        membership_tier: MembershipTier::parse(&tier),
        points: row.get(5)?,
        member_since: row.get(6)?,
    })
}

fn pet_from_row(row: &Row<'_>) -> rusqlite::Result<Pet> {
    Ok(Pet {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        name: row.get(2)?,
        species: row.get(3)?,
        breed: row.get(4)?,
        birth_date: row.get(5)?,
        gender: row.get(6)?,
        status: row.get(7)?,
    })
}

impl Database {
    /// Insert a customer, or update it when its id already exists. Returns the id.
    pub fn upsert_customer(&self, customer: &Customer) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                INSERT INTO customers (
                    id, full_name, phone, email, membership_tier, points, member_since
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    full_name = excluded.full_name,
                    phone = excluded.phone,
                    email = excluded.email,
                    membership_tier = excluded.membership_tier,
                    points = excluded.points,
                    member_since = excluded.member_since
                RETURNING id
                "#,
                params![
                    assigned_id(customer.id),
                    customer.full_name,
                    customer.phone,
                    customer.email,
                    customer.membership_tier.as_str(),
                    customer.points,
                    customer.member_since,
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Get a customer by ID.
    pub fn get_customer(&self, id: i64) -> DbResult<Option<Customer>> {
        self.conn
            .query_row(
                r#"
                SELECT id, full_name, phone, email, membership_tier, points, member_since
                FROM customers
                WHERE id = ?
                "#,
                [id],
                customer_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert a pet, or update it when its id already exists. Returns the id.
    pub fn upsert_pet(&self, pet: &Pet) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                INSERT INTO pets (
                    id, customer_id, name, species, breed, birth_date, gender, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    customer_id = excluded.customer_id,
                    name = excluded.name,
                    species = excluded.species,
                    breed = excluded.breed,
                    birth_date = excluded.birth_date,
                    gender = excluded.gender,
                    status = excluded.status
                RETURNING id
                "#,
                params![
                    assigned_id(pet.id),
                    pet.customer_id,
                    pet.name,
                    pet.species,
                    pet.breed,
                    pet.birth_date,
                    pet.gender,
                    pet.status,
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Get a pet by ID.
    pub fn get_pet(&self, id: i64) -> DbResult<Option<Pet>> {
        self.conn
            .query_row(
                r#"
                SELECT id, customer_id, name, species, breed, birth_date, gender, status
                FROM pets
                WHERE id = ?
                "#,
                [id],
                pet_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List a customer's pets.
    pub fn list_pets_for_customer(&self, customer_id: i64) -> DbResult<Vec<Pet>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, customer_id, name, species, breed, birth_date, gender, status
            FROM pets
            WHERE customer_id = ?
            ORDER BY name, id
            "#,
        )?;
        let rows = stmt.query_map([customer_id], pet_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_customer() {
        let db = Database::open_in_memory().unwrap();

        let mut customer = Customer::new("Tran Thi Binh".into());
        customer.phone = Some("0901234567".into());
        customer.membership_tier = MembershipTier::Gold;
        customer.points = 120;
        let id = db.upsert_customer(&customer).unwrap();

        let retrieved = db.get_customer(id).unwrap().unwrap();
        assert_eq!(retrieved.full_name, "Tran Thi Binh");
        assert_eq!(retrieved.membership_tier, MembershipTier::Gold);
        assert_eq!(retrieved.points, 120);
        assert!(db.get_customer(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_pets_belong_to_customer() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.upsert_customer(&Customer::new("An".into())).unwrap();
        let other = db.upsert_customer(&Customer::new("Binh".into())).unwrap();

        let milo = db
            .upsert_pet(&Pet::new(owner, "Milo".into(), "canine".into()))
            .unwrap();
        db.upsert_pet(&Pet::new(owner, "Bong".into(), "feline".into()))
            .unwrap();
        db.upsert_pet(&Pet::new(other, "Lu".into(), "canine".into()))
            .unwrap();

        let pets = db.list_pets_for_customer(owner).unwrap();
        assert_eq!(pets.len(), 2);
        assert_eq!(pets[0].name, "Bong");
        assert!(db.get_pet(milo).unwrap().unwrap().is_owned_by(owner));
    }

    #[test]
    fn test_pet_requires_existing_customer() {
        let db = Database::open_in_memory().unwrap();
        let result = db.upsert_pet(&Pet::new(999, "Ghost".into(), "canine".into()));
        assert!(result.is_err());
    }
}
