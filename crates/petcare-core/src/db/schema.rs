//! SQLite schema definition.

/// Complete database schema for the clinic store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Branches & Staff
-- ============================================================================

CREATE TABLE IF NOT EXISTS branches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT,
    phone TEXT
);

CREATE TABLE IF NOT EXISTS employees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    branch_id INTEGER NOT NULL REFERENCES branches(id),
    full_name TEXT NOT NULL,
    position TEXT NOT NULL
        CHECK (position IN ('admin', 'veterinarian', 'reception', 'sales', 'other')),
    code TEXT
);

CREATE INDEX IF NOT EXISTS idx_employees_branch ON employees(branch_id, position);

-- ============================================================================
-- Customers & Pets
-- ============================================================================

CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    membership_tier TEXT NOT NULL DEFAULT 'Standard',
    points INTEGER NOT NULL DEFAULT 0,
    member_since TEXT
);

CREATE INDEX IF NOT EXISTS idx_customers_phone ON customers(phone);

CREATE TABLE IF NOT EXISTS pets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    name TEXT NOT NULL,
    species TEXT NOT NULL,
    breed TEXT,
    birth_date TEXT,
    gender TEXT,
    status TEXT
);

CREATE INDEX IF NOT EXISTS idx_pets_customer ON pets(customer_id);

-- ============================================================================
-- Bookings (status changes only, never deleted)
-- ============================================================================

CREATE TABLE IF NOT EXISTS bookings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    pet_id INTEGER NOT NULL REFERENCES pets(id),
    branch_id INTEGER NOT NULL REFERENCES branches(id),
    doctor_id INTEGER REFERENCES employees(id),    -- NULL = clinic assigns
    booking_type TEXT NOT NULL,
    requested_at TEXT NOT NULL,                    -- RFC 3339 UTC, fixed width
    status TEXT NOT NULL DEFAULT 'Pending'
        CHECK (status IN ('Pending', 'Confirmed', 'Completed', 'Cancelled')),
    notes TEXT,
    version INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_bookings_branch ON bookings(branch_id, requested_at);
CREATE INDEX IF NOT EXISTS idx_bookings_customer ON bookings(customer_id);
CREATE INDEX IF NOT EXISTS idx_bookings_doctor ON bookings(doctor_id, requested_at);

-- ============================================================================
-- Invoices
-- ============================================================================

CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    branch_id INTEGER NOT NULL REFERENCES branches(id),
    invoice_date TEXT NOT NULL,
    total_amount REAL NOT NULL,
    discount_amount REAL NOT NULL DEFAULT 0,
    final_amount REAL,
    status TEXT NOT NULL DEFAULT 'Pending'
        CHECK (status IN ('Pending', 'Paid', 'Cancelled')),
    version INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_invoices_branch ON invoices(branch_id, invoice_date);

CREATE TABLE IF NOT EXISTS invoice_lines (
    invoice_id INTEGER NOT NULL REFERENCES invoices(id),
    line_no INTEGER NOT NULL,
    item_kind TEXT NOT NULL CHECK (item_kind IN ('product', 'service')),
    item_id INTEGER NOT NULL,
    description TEXT NOT NULL,
    quantity REAL NOT NULL,
    unit_price REAL NOT NULL,
    total REAL NOT NULL,
    PRIMARY KEY (invoice_id, line_no)
);

-- ============================================================================
-- Vaccination History (Append-Only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS vaccine_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pet_id INTEGER NOT NULL REFERENCES pets(id),
    vaccine_id INTEGER NOT NULL,
    branch_id INTEGER NOT NULL REFERENCES branches(id),
    doctor_id INTEGER NOT NULL REFERENCES employees(id),
    dose TEXT NOT NULL,
    date_administered TEXT NOT NULL,
    next_due_date TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_vaccine_records_pet ON vaccine_records(pet_id);

CREATE TRIGGER IF NOT EXISTS vaccine_records_no_update BEFORE UPDATE ON vaccine_records
BEGIN
    SELECT RAISE(ABORT, 'Vaccine records are append-only');
END;

CREATE TRIGGER IF NOT EXISTS vaccine_records_no_delete BEFORE DELETE ON vaccine_records
BEGIN
    SELECT RAISE(ABORT, 'Vaccine records are append-only');
END;
"#;
