//! Unit event log database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{UnitEvent, UnitEventKind};

impl Database {
    /// Append an already-hashed event. Returns its sequence number.
    pub fn insert_unit_event(
        &self,
        unit_id: &str,
        kind: UnitEventKind,
        payload: &str,
        prev_hash: &str,
        hash: &str,
        recorded_at: &str,
    ) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO unit_events (unit_id, kind, payload, prev_hash, hash, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![unit_id, kind.as_str(), payload, prev_hash, hash, recorded_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Hash of the newest event, if any.
    pub fn last_unit_event_hash(&self) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT hash FROM unit_events ORDER BY sequence DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_unit_events(&self, unit_id: &str) -> DbResult<Vec<UnitEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sequence, unit_id, kind, payload, prev_hash, hash, recorded_at
            FROM unit_events
            WHERE unit_id = ?
            ORDER BY sequence
            "#,
        )?;
        let rows = stmt.query_map([unit_id], map_event_row)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.try_into()?);
        }
        Ok(events)
    }

    /// The whole log in append order.
    pub fn list_all_unit_events(&self) -> DbResult<Vec<UnitEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sequence, unit_id, kind, payload, prev_hash, hash, recorded_at
            FROM unit_events
            ORDER BY sequence
            "#,
        )?;
        let rows = stmt.query_map([], map_event_row)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.try_into()?);
        }
        Ok(events)
    }
}

/// Intermediate row struct for database mapping.
struct EventRow {
    sequence: i64,
    unit_id: String,
    kind: String,
    payload: String,
    prev_hash: String,
    hash: String,
    recorded_at: String,
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        sequence: row.get(0)?,
        unit_id: row.get(1)?,
        kind: row.get(2)?,
        payload: row.get(3)?,
        prev_hash: row.get(4)?,
        hash: row.get(5)?,
        recorded_at: row.get(6)?,
    })
}

impl TryFrom<EventRow> for UnitEvent {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let kind = UnitEventKind::parse(&row.kind)
            .ok_or_else(|| DbError::Constraint(format!("Unknown event kind: {}", row.kind)))?;
        Ok(UnitEvent {
            sequence: row.sequence,
            unit_id: row.unit_id,
            kind,
            payload: row.payload,
            prev_hash: row.prev_hash,
            hash: row.hash,
            recorded_at: row.recorded_at,
        })
    }
}
