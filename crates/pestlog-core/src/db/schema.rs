//! SQLite schema definition.

/// Complete database schema for pestlog.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Service Logs
-- ============================================================================

-- The record itself is stored as wire JSON; rows written by older app
-- versions may carry camelCase field names and are decoded through the
-- wire adapter.
CREATE TABLE IF NOT EXISTS service_logs (
    log_id TEXT PRIMARY KEY,
    visit_id TEXT NOT NULL,
    customer_id TEXT,
    technician_id TEXT,
    service_type TEXT NOT NULL,
    record TEXT NOT NULL,                        -- JSON ServiceVisitRecord (wire form)
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_service_logs_visit_id ON service_logs(visit_id);
CREATE INDEX IF NOT EXISTS idx_service_logs_customer ON service_logs(customer_id);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    appointment_id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL,
    date TEXT NOT NULL,                          -- YYYY-MM-DD
    time TEXT,                                   -- HH:MM
    status TEXT NOT NULL DEFAULT 'scheduled',    -- scheduled, completed, cancelled
    visit_id TEXT,
    service_type TEXT,
    service_subtype TEXT,
    other_pest_name TEXT,
    service_price REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_appointments_date_customer
    ON appointments(date, customer_id);
CREATE INDEX IF NOT EXISTS idx_appointments_visit_id ON appointments(visit_id);
"#;
