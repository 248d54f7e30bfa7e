//! Reference data operations: blood types, components and compatibility rules.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{BloodComponent, BloodType, CompatibilityRule};

impl Database {
    // =========================================================================
    // Blood Types
    // =========================================================================

    /// Insert a blood type with the next free id.
    pub fn insert_blood_type(&self, name: &str) -> DbResult<BloodType> {
        self.conn
            .execute("INSERT INTO blood_types (name) VALUES (?)", [name])?;
        Ok(BloodType {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Return the blood type called `name`, inserting it if missing.
    ///
    /// A new row takes `preferred_id` when that id is free, else the next free id.
    pub fn ensure_blood_type(&self, preferred_id: i64, name: &str) -> DbResult<BloodType> {
        if let Some(existing) = self.find_blood_type_by_name(name)? {
            return Ok(existing);
        }
        if self.get_blood_type(preferred_id)?.is_some() {
            return self.insert_blood_type(name);
        }
        self.conn.execute(
            "INSERT INTO blood_types (id, name) VALUES (?1, ?2)",
            params![preferred_id, name],
        )?;
        Ok(BloodType {
            id: preferred_id,
            name: name.to_string(),
        })
    }

    pub fn get_blood_type(&self, id: i64) -> DbResult<Option<BloodType>> {
        self.conn
            .query_row(
                "SELECT id, name FROM blood_types WHERE id = ?",
                [id],
                map_blood_type,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Look up a blood type by name (case-insensitive).
    pub fn find_blood_type_by_name(&self, name: &str) -> DbResult<Option<BloodType>> {
        self.conn
            .query_row(
                "SELECT id, name FROM blood_types WHERE name = ?",
                [name],
                map_blood_type,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All blood types, ascending by id.
    pub fn list_blood_types(&self) -> DbResult<Vec<BloodType>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM blood_types ORDER BY id")?;
        let rows = stmt.query_map([], map_blood_type)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Return the component called `name`, inserting it if missing.
    ///
    /// Same id policy as [`Self::ensure_blood_type`]. An existing row keeps its
    /// shelf life.
    pub fn ensure_component(
        &self,
        preferred_id: i64,
        name: &str,
        shelf_life_days: i64,
    ) -> DbResult<BloodComponent> {
        if let Some(existing) = self.find_component_by_name(name)? {
            return Ok(existing);
        }
        // NULL id lets SQLite pick the next rowid
        let id = match self.get_component(preferred_id)? {
            Some(_) => None,
            None => Some(preferred_id),
        };
        self.conn.execute(
            "INSERT INTO blood_components (id, name, shelf_life_days) VALUES (?1, ?2, ?3)",
            params![id, name, shelf_life_days],
        )?;
        Ok(BloodComponent {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            shelf_life_days,
        })
    }

    pub fn get_component(&self, id: i64) -> DbResult<Option<BloodComponent>> {
        self.conn
            .query_row(
                "SELECT id, name, shelf_life_days FROM blood_components WHERE id = ?",
                [id],
                map_component,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Look up a component by name (case-insensitive).
    pub fn find_component_by_name(&self, name: &str) -> DbResult<Option<BloodComponent>> {
        self.conn
            .query_row(
                "SELECT id, name, shelf_life_days FROM blood_components WHERE name = ?",
                [name],
                map_component,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_components(&self) -> DbResult<Vec<BloodComponent>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, shelf_life_days FROM blood_components ORDER BY id")?;
        let rows = stmt.query_map([], map_component)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // =========================================================================
    // Compatibility Rules
    // =========================================================================

    /// Insert or replace the rule for (donor, recipient, component).
    pub fn upsert_rule(
        &self,
        donor_blood_type_id: i64,
        recipient_blood_type_id: i64,
        component_id: Option<i64>,
        is_compatible: bool,
    ) -> DbResult<CompatibilityRule> {
        // `IS` matches NULL component ids as equal
        let updated = self.conn.execute(
            r#"
            UPDATE compatibility_rules SET is_compatible = ?4
            WHERE donor_blood_type_id = ?1
              AND recipient_blood_type_id = ?2
              AND component_id IS ?3
            "#,
            params![donor_blood_type_id, recipient_blood_type_id, component_id, is_compatible],
        )?;

        if updated == 0 {
            self.conn.execute(
                r#"
                INSERT INTO compatibility_rules (
                    donor_blood_type_id, recipient_blood_type_id, component_id, is_compatible
                ) VALUES (?1, ?2, ?3, ?4)
                "#,
                params![donor_blood_type_id, recipient_blood_type_id, component_id, is_compatible],
            )?;
        }

        let rule = self.conn.query_row(
            r#"
            SELECT id, donor_blood_type_id, recipient_blood_type_id, component_id, is_compatible
            FROM compatibility_rules
            WHERE donor_blood_type_id = ?1
              AND recipient_blood_type_id = ?2
              AND component_id IS ?3
            "#,
            params![donor_blood_type_id, recipient_blood_type_id, component_id],
            map_rule,
        )?;
        Ok(rule)
    }

    /// Insert a rule unless one already exists for (donor, recipient, component).
    ///
    /// Returns whether a row was inserted; existing rules keep their value.
    pub fn ensure_rule(
        &self,
        donor_blood_type_id: i64,
        recipient_blood_type_id: i64,
        component_id: Option<i64>,
        is_compatible: bool,
    ) -> DbResult<bool> {
        let inserted = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO compatibility_rules (
                donor_blood_type_id, recipient_blood_type_id, component_id, is_compatible
            ) VALUES (?1, ?2, ?3, ?4)
            "#,
            params![donor_blood_type_id, recipient_blood_type_id, component_id, is_compatible],
        )?;
        Ok(inserted > 0)
    }

    /// Rules for a recipient that apply to `component_id` (scoped) or to every
    /// component (general). Without a component only general rules match.
    pub fn rules_for_recipient(
        &self,
        recipient_blood_type_id: i64,
        component_id: Option<i64>,
    ) -> DbResult<Vec<CompatibilityRule>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, donor_blood_type_id, recipient_blood_type_id, component_id, is_compatible
            FROM compatibility_rules
            WHERE recipient_blood_type_id = ?1
              AND (component_id IS NULL OR component_id = ?2)
            ORDER BY donor_blood_type_id, component_id
            "#,
        )?;
        let rows = stmt.query_map(params![recipient_blood_type_id, component_id], map_rule)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every rule, grouped by recipient.
    pub fn list_rules(&self) -> DbResult<Vec<CompatibilityRule>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, donor_blood_type_id, recipient_blood_type_id, component_id, is_compatible
            FROM compatibility_rules
            ORDER BY recipient_blood_type_id, donor_blood_type_id, component_id
            "#,
        )?;
        let rows = stmt.query_map([], map_rule)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

}

fn map_blood_type(row: &Row<'_>) -> rusqlite::Result<BloodType> {
    Ok(BloodType {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn map_component(row: &Row<'_>) -> rusqlite::Result<BloodComponent> {
    Ok(BloodComponent {
        id: row.get(0)?,
        name: row.get(1)?,
        shelf_life_days: row.get(2)?,
    })
}

fn map_rule(row: &Row<'_>) -> rusqlite::Result<CompatibilityRule> {
    Ok(CompatibilityRule {
        id: row.get(0)?,
        donor_blood_type_id: row.get(1)?,
        recipient_blood_type_id: row.get(2)?,
        component_id: row.get(3)?,
        is_compatible: row.get(4)?,
    })
}
