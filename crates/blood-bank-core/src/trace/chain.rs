//! Append-only unit event chain.
//!
//! Each event links to the previous one: `hash = SHA-256(prev_hash ‖ payload)`.
//! Rewriting any stored payload breaks every hash after it.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::db::{count_to_u32, Database, DbResult};
use crate::models::{now_timestamp, ChainVerification, UnitEvent, UnitEventKind};

/// Event log manager.
pub struct TraceLog<'a> {
    db: &'a Database,
}

impl<'a> TraceLog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an event for a unit. Call inside the mutation's unit of work.
    pub fn record<T: Serialize>(
        &self,
        unit_id: &str,
        kind: UnitEventKind,
        payload: &T,
    ) -> DbResult<UnitEvent> {
        let payload = serde_json::to_string(payload)?;
        let prev_hash = self.db.last_unit_event_hash()?.unwrap_or_default();
        let hash = chain_hash(&prev_hash, &payload);
        let recorded_at = now_timestamp();

        let sequence = self
            .db
            .insert_unit_event(unit_id, kind, &payload, &prev_hash, &hash, &recorded_at)?;

        tracing::debug!(unit_id = %unit_id, kind = kind.as_str(), sequence, "recorded unit event");

        Ok(UnitEvent {
            sequence,
            unit_id: unit_id.to_string(),
            kind,
            payload,
            prev_hash,
            hash,
            recorded_at,
        })
    }

    /// A unit's events in append order.
    pub fn history(&self, unit_id: &str) -> DbResult<Vec<UnitEvent>> {
        self.db.list_unit_events(unit_id)
    }

    /// Recompute every hash from the start of the log.
    pub fn verify_chain(&self) -> DbResult<ChainVerification> {
        let events = self.db.list_all_unit_events()?;
        let mut expected_prev = String::new();
        let mut first_broken_sequence = None;

        for event in &events {
            let linked = event.prev_hash == expected_prev;
            let intact = event.hash == chain_hash(&event.prev_hash, &event.payload);
            if !(linked && intact) {
                first_broken_sequence = Some(event.sequence);
                break;
            }
            expected_prev = event.hash.clone();
        }

        if let Some(sequence) = first_broken_sequence {
            tracing::warn!(sequence, "unit event chain broken");
        }

        Ok(ChainVerification {
            events: count_to_u32(events.len(), "unit event")?,
            valid: first_broken_sequence.is_none(),
            first_broken_sequence,
        })
    }
}

/// hex(SHA-256(prev_hash ‖ payload)).
pub fn chain_hash(prev_hash: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodUnit, Member};
    use chrono::Utc;
    use serde_json::json;

    fn setup() -> (Database, BloodUnit) {
        let db = Database::open_in_memory().unwrap();
        db.ensure_blood_type(1, "O-").unwrap();
        db.ensure_component(1, "Whole Blood", 35).unwrap();
        let donor = Member::new("Donor".into(), Some(1));
        db.insert_member(&donor).unwrap();
        let unit = BloodUnit::new(1, 1, donor.member_id, 450, 35, Utc::now());
        db.insert_unit(&unit).unwrap();
        (db, unit)
    }

    #[test]
    fn test_chain_hash_known_value() {
        // SHA-256 of the empty string
        assert_eq!(
            chain_hash("", ""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(chain_hash("a", "b"), chain_hash("", "ab"));
        assert_ne!(chain_hash("a", "b"), chain_hash("b", "a"));
    }

    #[test]
    fn test_record_links_events() {
        let (db, unit) = setup();
        let log = TraceLog::new(&db);

        let first = log
            .record(&unit.unit_id, UnitEventKind::Created, &json!({"volume": 450}))
            .unwrap();
        let second = log
            .record(&unit.unit_id, UnitEventKind::Assigned, &json!({"assigned": 100}))
            .unwrap();

        assert_eq!(first.prev_hash, "");
        assert_eq!(second.prev_hash, first.hash);
        assert!(second.sequence > first.sequence);

        let history = log.history(&unit.unit_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].kind, UnitEventKind::Assigned);
    }

    #[test]
    fn test_verify_empty_and_intact_chain() {
        let (db, unit) = setup();
        let log = TraceLog::new(&db);

        let empty = log.verify_chain().unwrap();
        assert!(empty.valid);
        assert_eq!(empty.events, 0);

        for volume in [450, 300, 0] {
            log.record(&unit.unit_id, UnitEventKind::Updated, &json!({"remaining": volume}))
                .unwrap();
        }
        let verification = log.verify_chain().unwrap();
        assert!(verification.valid);
        assert_eq!(verification.events, 3);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let (db, unit) = setup();
        let log = TraceLog::new(&db);
        for volume in [450, 300, 0] {
            log.record(&unit.unit_id, UnitEventKind::Updated, &json!({"remaining": volume}))
                .unwrap();
        }

        db.conn()
            .execute_batch(
                r#"
                DROP TRIGGER unit_events_no_update;
                UPDATE unit_events SET payload = '{"remaining":999}' WHERE sequence = 2;
                "#,
            )
            .unwrap();

        let verification = log.verify_chain().unwrap();
        assert!(!verification.valid);
        assert_eq!(verification.first_broken_sequence, Some(2));
    }
}
