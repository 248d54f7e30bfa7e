//! Member database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Member;

const MEMBER_COLUMNS: &str = "member_id, full_name, blood_type_id, email, phone, last_donation_at, created_at, updated_at";

impl Database {
    /// Insert a new member.
    pub fn insert_member(&self, member: &Member) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO members (
                member_id, full_name, blood_type_id, email, phone,
                last_donation_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                member.member_id,
                member.full_name,
                member.blood_type_id,
                member.email,
                member.phone,
                member.last_donation_at,
                member.created_at,
                member.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_member(&self, member_id: &str) -> DbResult<Option<Member>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM members WHERE member_id = ?", MEMBER_COLUMNS),
                [member_id],
                map_member,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Search members by name (prefix match).
    pub fn search_members(&self, query: &str, limit: usize) -> DbResult<Vec<Member>> {
        let pattern = format!("{}%", query);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM members WHERE full_name LIKE ? ORDER BY full_name LIMIT ?",
            MEMBER_COLUMNS
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], map_member)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Stamp the member's latest completed donation.
    pub fn record_member_donation(&self, member_id: &str, at: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE members SET last_donation_at = ?2, updated_at = ?2 WHERE member_id = ?1",
            params![member_id, at],
        )?;
        Ok(rows_affected > 0)
    }
}

fn map_member(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        member_id: row.get(0)?,
        full_name: row.get(1)?,
        blood_type_id: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        last_donation_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.ensure_blood_type(1, "O-").unwrap();
        db
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let mut member = Member::new("Grace Hopper".into(), Some(1));
        member.email = Some("grace@example.org".into());
        db.insert_member(&member).unwrap();

        let retrieved = db.get_member(&member.member_id).unwrap().unwrap();
        assert_eq!(retrieved, member);
    }

    #[test]
    fn test_unknown_blood_type_rejected() {
        let db = setup_db();
        let member = Member::new("Nobody".into(), Some(99));
        assert!(db.insert_member(&member).is_err());
    }

    #[test]
    fn test_search_members() {
        let db = setup_db();
        db.insert_member(&Member::new("Alice".into(), None)).unwrap();
        db.insert_member(&Member::new("Alan".into(), None)).unwrap();
        db.insert_member(&Member::new("Bob".into(), None)).unwrap();

        let results = db.search_members("Al", 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].full_name, "Alan");
    }

    #[test]
    fn test_record_donation() {
        let db = setup_db();
        let member = Member::new("Donor".into(), Some(1));
        db.insert_member(&member).unwrap();

        assert!(db
            .record_member_donation(&member.member_id, "2026-10-14T09:00:00Z")
            .unwrap());
        let retrieved = db.get_member(&member.member_id).unwrap().unwrap();
        assert_eq!(retrieved.last_donation_at.as_deref(), Some("2026-10-14T09:00:00Z"));

        assert!(!db.record_member_donation("missing", "2026-10-14T09:00:00Z").unwrap());
    }
}
