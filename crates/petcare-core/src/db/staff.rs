//! Branch and employee database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{assigned_id, Database, DbError, DbResult};
use crate::models::{Branch, Employee, Position};

impl Database {
    /// Insert a branch, or update it when its id already exists. Returns the id.
    pub fn upsert_branch(&self, branch: &Branch) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                INSERT INTO branches (id, name, address, phone)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    address = excluded.address,
                    phone = excluded.phone
                RETURNING id
                "#,
                params![assigned_id(branch.id), branch.name, branch.address, branch.phone],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Get a branch by ID.
    pub fn get_branch(&self, id: i64) -> DbResult<Option<Branch>> {
        self.conn
            .query_row(
                "SELECT id, name, address, phone FROM branches WHERE id = ?",
                [id],
                |row| {
                    Ok(Branch {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        address: row.get(2)?,
                        phone: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all branches.
    pub fn list_branches(&self) -> DbResult<Vec<Branch>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, address, phone FROM branches ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Branch {
                id: row.get(0)?,
                name: row.get(1)?,
                address: row.get(2)?,
                phone: row.get(3)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Insert an employee, or update it when its id already exists. Returns the id.
    pub fn upsert_employee(&self, employee: &Employee) -> DbResult<i64> {
        self.conn
            .query_row(
                r#"
                INSERT INTO employees (id, branch_id, full_name, position, code)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    branch_id = excluded.branch_id,
                    full_name = excluded.full_name,
                    position = excluded.position,
                    code = excluded.code
                RETURNING id
                "#,
                params![
                    assigned_id(employee.id),
                    employee.branch_id,
                    employee.full_name,
                    employee.position.as_str(),
                    employee.code,
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Get an employee by ID.
    pub fn get_employee(&self, id: i64) -> DbResult<Option<Employee>> {
        self.conn
            .query_row(
                "SELECT id, branch_id, full_name, position, code FROM employees WHERE id = ?",
                [id],
                EmployeeRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Employees of a branch, optionally restricted to one position.
    pub fn list_employees(&self, branch_id: i64, position: Option<Position>) -> DbResult<Vec<Employee>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, branch_id, full_name, position, code
            FROM employees
            WHERE branch_id = ?1 AND (?2 IS NULL OR position = ?2)
            ORDER BY full_name, id
            "#,
        )?;
        let rows = stmt.query_map(
            params![branch_id, position.map(|p| p.as_str())],
            EmployeeRow::from_row,
        )?;

        let mut employees = Vec::new();
        for row in rows {
            employees.push(row?.try_into()?);
        }
        Ok(employees)
    }
}

/// Intermediate row struct for database mapping.
struct EmployeeRow {
    id: i64,
    branch_id: i64,
    full_name: String,
    position: String,
    code: Option<String>,
}

impl EmployeeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            branch_id: row.get(1)?,
            full_name: row.get(2)?,
            position: row.get(3)?,
            code: row.get(4)?,
        })
    }
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = DbError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let position = Position::parse(&row.position)
            .ok_or_else(|| DbError::Constraint(format!("Unknown position: {}", row.position)))?;
        Ok(Employee {
            id: row.id,
            branch_id: row.branch_id,
            full_name: row.full_name,
            position,
            code: row.code,
        })
    }
}
