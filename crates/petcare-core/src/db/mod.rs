//! Database layer: the CRUD data API the booking core is built on.

mod schema;
mod bookings;
mod customers;
mod invoices;
mod staff;
mod vaccines;

pub use schema::*;
pub use bookings::BookingFilter;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::clinic_time::TimeError;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored timestamp is invalid: {0}")]
    Time(#[from] TimeError),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema and SQL helper functions.
    fn initialize(&self) -> DbResult<()> {
        // SQLite's own lower() and LIKE only fold ASCII
        self.conn.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|v| v.to_lowercase()))
            },
        )?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` in a transaction; nothing it wrote survives an `Err`.
    ///
    /// Inside an already open transaction `f` joins it, and the outermost
    /// caller commits or rolls back.
    pub fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<DbError>,
    {
        if !self.conn.is_autocommit() {
            return f();
        }
        let tx = self.conn.unchecked_transaction().map_err(DbError::from)?;
        let value = f()?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }
}

/// Ids are assigned by SQLite unless the record already carries one
/// (records imported from the backend keep their ids).
pub(crate) fn assigned_id(id: i64) -> Option<i64> {
    (id > 0).then_some(id)
}

/// Case-folded `%term%` for LIKE against `fold_case(col)`, with wildcards in
/// the term escaped (`ESCAPE '\'`).
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
