//! SQLite schema definition.

/// Complete database schema for the blood bank.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Reference Data
-- ============================================================================

CREATE TABLE IF NOT EXISTS blood_types (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

CREATE TABLE IF NOT EXISTS blood_components (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    shelf_life_days INTEGER NOT NULL CHECK (shelf_life_days > 0)
);

CREATE TABLE IF NOT EXISTS compatibility_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    donor_blood_type_id INTEGER NOT NULL REFERENCES blood_types(id),
    recipient_blood_type_id INTEGER NOT NULL REFERENCES blood_types(id),
    component_id INTEGER REFERENCES blood_components(id),   -- NULL = general rule
    is_compatible INTEGER NOT NULL CHECK (is_compatible IN (0, 1))
);

-- One authoritative rule per (donor, recipient, component); one general rule per pair
CREATE UNIQUE INDEX IF NOT EXISTS idx_rules_pair_component
    ON compatibility_rules(donor_blood_type_id, recipient_blood_type_id, COALESCE(component_id, 0));
CREATE INDEX IF NOT EXISTS idx_rules_recipient
    ON compatibility_rules(recipient_blood_type_id, component_id);

-- ============================================================================
-- Members (donors and recipients)
-- ============================================================================

CREATE TABLE IF NOT EXISTS members (
    member_id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    blood_type_id INTEGER REFERENCES blood_types(id),
    email TEXT,
    phone TEXT,
    last_donation_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_members_name ON members(full_name);

-- ============================================================================
-- Blood Units (Inventory)
-- ============================================================================

CREATE TABLE IF NOT EXISTS blood_units (
    unit_id TEXT PRIMARY KEY,
    blood_type_id INTEGER NOT NULL REFERENCES blood_types(id),
    component_id INTEGER NOT NULL REFERENCES blood_components(id),
    donor_member_id TEXT NOT NULL REFERENCES members(member_id),
    volume INTEGER NOT NULL CHECK (volume > 0),
    remaining_volume INTEGER NOT NULL CHECK (remaining_volume >= 0 AND remaining_volume <= volume),
    status TEXT NOT NULL DEFAULT 'available' CHECK (status IN ('available', 'used', 'removed')),
    add_date TEXT NOT NULL,
    expiry_date TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,          -- optimistic lock
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_units_lookup ON blood_units(blood_type_id, component_id, status);
CREATE INDEX IF NOT EXISTS idx_units_expiry ON blood_units(expiry_date);
CREATE INDEX IF NOT EXISTS idx_units_donor ON blood_units(donor_member_id);

-- Removed units hold no volume
CREATE TRIGGER IF NOT EXISTS blood_units_removed_empty BEFORE UPDATE ON blood_units
WHEN new.status = 'removed' AND new.remaining_volume <> 0
BEGIN
    SELECT RAISE(ABORT, 'Removed units must have zero remaining volume');
END;

-- ============================================================================
-- Transfusion Requests
-- ============================================================================

CREATE TABLE IF NOT EXISTS transfusion_requests (
    request_id TEXT PRIMARY KEY,
    recipient_member_id TEXT NOT NULL REFERENCES members(member_id),
    blood_type_id INTEGER NOT NULL REFERENCES blood_types(id),
    component_id INTEGER NOT NULL REFERENCES blood_components(id),
    requested_volume INTEGER NOT NULL CHECK (requested_volume > 0),
    status TEXT NOT NULL DEFAULT 'pending',     -- pending, approved, completed, cancelled, rejected
    notes TEXT,
    requested_at TEXT NOT NULL,
    approved_at TEXT,
    completed_at TEXT,
    cancelled_at TEXT,
    rejected_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_transfusions_status ON transfusion_requests(status);
CREATE INDEX IF NOT EXISTS idx_transfusions_recipient ON transfusion_requests(recipient_member_id);

-- Units allocated to a request; one row per (request, unit)
CREATE TABLE IF NOT EXISTS transfusion_request_units (
    request_id TEXT NOT NULL REFERENCES transfusion_requests(request_id),
    unit_id TEXT NOT NULL REFERENCES blood_units(unit_id),
    assigned_volume INTEGER NOT NULL CHECK (assigned_volume > 0),
    status TEXT NOT NULL DEFAULT 'assigned',     -- assigned, transfused, cancelled
    assigned_at TEXT NOT NULL,
    PRIMARY KEY (request_id, unit_id)
);

CREATE INDEX IF NOT EXISTS idx_assignments_unit ON transfusion_request_units(unit_id);

-- ============================================================================
-- Donation Requests
-- ============================================================================

CREATE TABLE IF NOT EXISTS donation_requests (
    request_id TEXT PRIMARY KEY,
    donor_member_id TEXT NOT NULL REFERENCES members(member_id),
    blood_type_id INTEGER NOT NULL REFERENCES blood_types(id),
    component_id INTEGER NOT NULL REFERENCES blood_components(id),
    status TEXT NOT NULL DEFAULT 'pending',
    collected_volume INTEGER,
    unit_id TEXT REFERENCES blood_units(unit_id),
    created_at TEXT NOT NULL,
    approved_at TEXT,
    completed_at TEXT,
    cancelled_at TEXT,
    rejected_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_donations_donor ON donation_requests(donor_member_id);
CREATE INDEX IF NOT EXISTS idx_donations_status ON donation_requests(status);

-- ============================================================================
-- Unit Events (Append-Only traceability log)
-- ============================================================================

CREATE TABLE IF NOT EXISTS unit_events (
    sequence INTEGER PRIMARY KEY AUTOINCREMENT,
    unit_id TEXT NOT NULL REFERENCES blood_units(unit_id),
    kind TEXT NOT NULL CHECK (kind IN ('created', 'updated', 'status_changed', 'assigned')),
    payload TEXT NOT NULL,                       -- canonical JSON
    prev_hash TEXT NOT NULL,
    hash TEXT NOT NULL UNIQUE,                   -- SHA-256(prev_hash || payload)
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_unit ON unit_events(unit_id);

CREATE TRIGGER IF NOT EXISTS unit_events_no_update BEFORE UPDATE ON unit_events
BEGIN
    SELECT RAISE(ABORT, 'Unit events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS unit_events_no_delete BEFORE DELETE ON unit_events
BEGIN
    SELECT RAISE(ABORT, 'Unit events are append-only');
END;
"#;
