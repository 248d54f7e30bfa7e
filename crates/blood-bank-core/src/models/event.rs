//! Traceability events for blood units.

use serde::{Deserialize, Serialize};

/// Kind of ledger mutation recorded against a unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnitEventKind {
    Created,
    Updated,
    StatusChanged,
    Assigned,
}

impl UnitEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitEventKind::Created => "created",
            UnitEventKind::Updated => "updated",
            UnitEventKind::StatusChanged => "status_changed",
            UnitEventKind::Assigned => "assigned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(UnitEventKind::Created),
            "updated" => Some(UnitEventKind::Updated),
            "status_changed" => Some(UnitEventKind::StatusChanged),
            "assigned" => Some(UnitEventKind::Assigned),
            _ => None,
        }
    }
}

/// One entry in the hash-chained unit event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitEvent {
    /// Monotonic position in the log, starting at 1
    pub sequence: i64,
    pub unit_id: String,
    pub kind: UnitEventKind,
    /// Canonical JSON snapshot of the change
    pub payload: String,
    /// Hash of the previous entry ("" for the first)
    pub prev_hash: String,
    /// hex(SHA-256(prev_hash ‖ payload))
    pub hash: String,
    pub recorded_at: String,
}

/// Result of walking the whole event chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    pub events: u32,
    pub valid: bool,
    /// First sequence whose hash or back-link does not match
    pub first_broken_sequence: Option<i64>,
}
