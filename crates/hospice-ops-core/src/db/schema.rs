//! SQLite schema definition.

/// Complete database schema for hospice-ops.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Invoices (persisted whole; nested patients/visits ride in JSON)
-- ============================================================================

CREATE TABLE IF NOT EXISTS invoices (
    invoice_id TEXT PRIMARY KEY,
    invoice_number TEXT NOT NULL,
    facility_id TEXT NOT NULL,
    facility_name TEXT NOT NULL,
    staff_id TEXT NOT NULL,
    staff_name TEXT NOT NULL,
    period_start TEXT NOT NULL,                  -- ISO date (YYYY-MM-DD)
    period_end TEXT NOT NULL,                    -- ISO date (YYYY-MM-DD)
    status TEXT NOT NULL DEFAULT 'draft'
        CHECK (status IN ('draft', 'submitted', 'paid', 'void')),
    total_amount REAL NOT NULL DEFAULT 0,        -- roll-up of visit rates
    patients TEXT NOT NULL DEFAULT '[]',         -- JSON array of InvoicePatient
    audit_log TEXT NOT NULL DEFAULT '[]',        -- JSON array of AuditEntry
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_invoices_facility ON invoices(facility_id);
CREATE INDEX IF NOT EXISTS idx_invoices_status ON invoices(status);
CREATE INDEX IF NOT EXISTS idx_invoices_period ON invoices(period_start);

-- ============================================================================
-- QA Assignments (persisted whole; nested reviews/documents ride in JSON)
-- ============================================================================

CREATE TABLE IF NOT EXISTS qa_assignments (
    assignment_id TEXT PRIMARY KEY,
    facility_id TEXT NOT NULL,
    facility_name TEXT NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    year INTEGER NOT NULL,
    assigned_roles TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    reviews TEXT NOT NULL DEFAULT '[]',          -- JSON array of QaPatientReview
    audit_log TEXT NOT NULL DEFAULT '[]',        -- JSON array of AuditEntry
    active_count INTEGER NOT NULL DEFAULT 0,     -- roll-up from discharge slots
    discharged_count INTEGER NOT NULL DEFAULT 0, -- roll-up from discharge slots
    visit_volume INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_assignments_facility ON qa_assignments(facility_id);
CREATE INDEX IF NOT EXISTS idx_assignments_cycle ON qa_assignments(year, month);

-- ============================================================================
-- Facility Column Configuration
-- ============================================================================

CREATE TABLE IF NOT EXISTS facility_config (
    facility_id TEXT PRIMARY KEY,
    enabled_columns TEXT                         -- JSON array of requirement ids, NULL = all
);

-- ============================================================================
-- Idempotency Tokens (one row per applied mutation token)
-- ============================================================================

CREATE TABLE IF NOT EXISTS mutation_tokens (
    token TEXT PRIMARY KEY,
    aggregate_id TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_tokens_aggregate ON mutation_tokens(aggregate_id);
"#;
