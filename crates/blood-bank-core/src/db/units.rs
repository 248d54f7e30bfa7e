//! Blood unit database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{count_to_u32, Database, DbError, DbResult};
use crate::models::{BloodUnit, UnitStatus};

const UNIT_COLUMNS: &str = r#"
    unit_id, blood_type_id, component_id, donor_member_id, volume, remaining_volume,
    status, add_date, expiry_date, version, updated_at
"#;

/// Unit count and summed remaining volume for a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryTotals {
    pub units: u32,
    pub remaining_volume: i64,
}

impl Database {
    /// Insert a new blood unit.
    pub fn insert_unit(&self, unit: &BloodUnit) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO blood_units (
                unit_id, blood_type_id, component_id, donor_member_id, volume,
                remaining_volume, status, add_date, expiry_date, version, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                unit.unit_id,
                unit.blood_type_id,
                unit.component_id,
                unit.donor_member_id,
                unit.volume,
                unit.remaining_volume,
                unit.status.as_str(),
                unit.add_date,
                unit.expiry_date,
                unit.version,
                unit.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_unit(&self, unit_id: &str) -> DbResult<Option<BloodUnit>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM blood_units WHERE unit_id = ?", UNIT_COLUMNS),
                [unit_id],
                map_unit_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Write a unit's mutable fields if its stored version still equals
    /// `unit.version`, bumping the stored version.
    ///
    /// Returns `false` when the row is missing or was written concurrently.
    pub fn update_unit_versioned(&self, unit: &BloodUnit) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE blood_units SET
                component_id = ?3,
                remaining_volume = ?4,
                status = ?5,
                expiry_date = ?6,
                version = version + 1,
                updated_at = ?7
            WHERE unit_id = ?1 AND version = ?2
            "#,
            params![
                unit.unit_id,
                unit.version,
                unit.component_id,
                unit.remaining_volume,
                unit.status.as_str(),
                unit.expiry_date,
                unit.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Available units with volume left, optionally restricted to a component
    /// and to units whose expiry lies after `not_expired_at`.
    ///
    /// First-expiring units come first.
    pub fn query_available_units(
        &self,
        blood_type_id: i64,
        component_id: Option<i64>,
        not_expired_at: Option<&str>,
    ) -> DbResult<Vec<BloodUnit>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM blood_units
            WHERE blood_type_id = ?1
              AND (?2 IS NULL OR component_id = ?2)
              AND status = 'available'
              AND remaining_volume > 0
              AND (?3 IS NULL OR expiry_date > ?3)
            ORDER BY expiry_date, unit_id
            "#,
            UNIT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![blood_type_id, component_id, not_expired_at], map_unit_row)?;

        let mut units = Vec::new();
        for row in rows {
            units.push(row?.try_into()?);
        }
        Ok(units)
    }

    /// Aggregate of [`Database::query_available_units`] computed in SQL.
    pub fn available_totals(
        &self,
        blood_type_id: i64,
        component_id: Option<i64>,
        not_expired_at: Option<&str>,
    ) -> DbResult<InventoryTotals> {
        let (units, remaining_volume): (i64, i64) = self.conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(remaining_volume), 0)
            FROM blood_units
            WHERE blood_type_id = ?1
              AND (?2 IS NULL OR component_id = ?2)
              AND status = 'available'
              AND remaining_volume > 0
              AND (?3 IS NULL OR expiry_date > ?3)
            "#,
            params![blood_type_id, component_id, not_expired_at],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(InventoryTotals {
            units: count_to_u32(units, "available unit")?,
            remaining_volume,
        })
    }

    /// Available units whose expiry is at or before `at`.
    pub fn list_expired_available_units(&self, at: &str) -> DbResult<Vec<BloodUnit>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM blood_units
            WHERE status = 'available' AND expiry_date <= ?
            ORDER BY expiry_date, unit_id
            "#,
            UNIT_COLUMNS
        ))?;
        let rows = stmt.query_map([at], map_unit_row)?;

        let mut units = Vec::new();
        for row in rows {
            units.push(row?.try_into()?);
        }
        Ok(units)
    }

    /// A donor's units, newest first.
    pub fn list_units_for_donor(&self, donor_member_id: &str) -> DbResult<Vec<BloodUnit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM blood_units WHERE donor_member_id = ? ORDER BY add_date DESC, unit_id",
            UNIT_COLUMNS
        ))?;
        let rows = stmt.query_map([donor_member_id], map_unit_row)?;

        let mut units = Vec::new();
        for row in rows {
            units.push(row?.try_into()?);
        }
        Ok(units)
    }
}

/// Intermediate row struct for database mapping.
struct UnitRow {
    unit_id: String,
    blood_type_id: i64,
    component_id: i64,
    donor_member_id: String,
    volume: i64,
    remaining_volume: i64,
    status: String,
    add_date: String,
    expiry_date: String,
    version: i64,
    updated_at: String,
}

fn map_unit_row(row: &Row<'_>) -> rusqlite::Result<UnitRow> {
    Ok(UnitRow {
        unit_id: row.get(0)?,
        blood_type_id: row.get(1)?,
        component_id: row.get(2)?,
        donor_member_id: row.get(3)?,
        volume: row.get(4)?,
        remaining_volume: row.get(5)?,
        status: row.get(6)?,
        add_date: row.get(7)?,
        expiry_date: row.get(8)?,
        version: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<UnitRow> for BloodUnit {
    type Error = DbError;

    fn try_from(row: UnitRow) -> Result<Self, Self::Error> {
        let status = UnitStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown unit status: {}", row.status)))?;

        Ok(BloodUnit {
            unit_id: row.unit_id,
            blood_type_id: row.blood_type_id,
            component_id: row.component_id,
            donor_member_id: row.donor_member_id,
            volume: row.volume,
            remaining_volume: row.remaining_volume,
            status,
            add_date: row.add_date,
            expiry_date: row.expiry_date,
            version: row.version,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Member;
    use chrono::{TimeZone, Utc};

    fn setup_db() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        db.ensure_blood_type(1, "O-").unwrap();
        db.ensure_blood_type(2, "O+").unwrap();
        db.ensure_component(1, "Whole Blood", 35).unwrap();
        db.ensure_component(2, "Platelets", 5).unwrap();
        let donor = Member::new("Donor".into(), Some(1));
        db.insert_member(&donor).unwrap();
        (db, donor.member_id)
    }

    fn make_unit(donor: &str, blood_type_id: i64, component_id: i64, volume: i64, day: u32) -> BloodUnit {
        let added = Utc.with_ymd_and_hms(2026, 1, day, 8, 0, 0).unwrap();
        BloodUnit::new(blood_type_id, component_id, donor.to_string(), volume, 35, added)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, donor) = setup_db();
        let unit = make_unit(&donor, 1, 1, 450, 1);
        db.insert_unit(&unit).unwrap();

        let retrieved = db.get_unit(&unit.unit_id).unwrap().unwrap();
        assert_eq!(retrieved, unit);
        assert!(db.get_unit("missing").unwrap().is_none());
    }

    #[test]
    fn test_versioned_update() {
        let (db, donor) = setup_db();
        let unit = make_unit(&donor, 1, 1, 450, 1);
        db.insert_unit(&unit).unwrap();

        let mut change = unit.clone();
        change.remaining_volume = 200;
        assert!(db.update_unit_versioned(&change).unwrap());

        let stored = db.get_unit(&unit.unit_id).unwrap().unwrap();
        assert_eq!(stored.remaining_volume, 200);
        assert_eq!(stored.version, 1);

        // Writing again with the stale version loses
        change.remaining_volume = 100;
        assert!(!db.update_unit_versioned(&change).unwrap());
        let stored = db.get_unit(&unit.unit_id).unwrap().unwrap();
        assert_eq!(stored.remaining_volume, 200);
    }

    #[test]
    fn test_query_available_filters_and_orders() {
        let (db, donor) = setup_db();
        let late = make_unit(&donor, 1, 1, 450, 10);
        let early = make_unit(&donor, 1, 1, 300, 2);
        let other_type = make_unit(&donor, 2, 1, 450, 1);
        let other_component = make_unit(&donor, 1, 2, 250, 1);
        let mut used = make_unit(&donor, 1, 1, 450, 1);
        used.status = UnitStatus::Used;
        for unit in [&late, &early, &other_type, &other_component, &used] {
            db.insert_unit(unit).unwrap();
        }

        let units = db.query_available_units(1, Some(1), None).unwrap();
        let ids: Vec<_> = units.iter().map(|u| u.unit_id.as_str()).collect();
        assert_eq!(ids, vec![early.unit_id.as_str(), late.unit_id.as_str()]);

        let any_component = db.query_available_units(1, None, None).unwrap();
        assert_eq!(any_component.len(), 3);

        let totals = db.available_totals(1, Some(1), None).unwrap();
        assert_eq!(totals, InventoryTotals { units: 2, remaining_volume: 750 });
    }

    #[test]
    fn test_query_available_excludes_expired() {
        let (db, donor) = setup_db();
        let unit = make_unit(&donor, 1, 1, 450, 1); // expires 2026-02-05T08:00:00Z
        db.insert_unit(&unit).unwrap();

        assert_eq!(db.query_available_units(1, None, Some("2026-02-05T07:59:59Z")).unwrap().len(), 1);
        assert!(db.query_available_units(1, None, Some("2026-02-05T08:00:00Z")).unwrap().is_empty());

        let expired = db.list_expired_available_units("2026-03-01T00:00:00Z").unwrap();
        assert_eq!(expired.len(), 1);
        let totals = db.available_totals(1, None, Some("2026-03-01T00:00:00Z")).unwrap();
        assert_eq!(totals, InventoryTotals::default());
    }

    #[test]
    fn test_list_units_for_donor() {
        let (db, donor) = setup_db();
        db.insert_unit(&make_unit(&donor, 1, 1, 450, 1)).unwrap();
        db.insert_unit(&make_unit(&donor, 1, 2, 250, 3)).unwrap();

        let units = db.list_units_for_donor(&donor).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].component_id, 2);
    }
}
