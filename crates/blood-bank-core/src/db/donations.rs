//! Donation request database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::requests::parse_request_status;
use super::{Database, DbError, DbResult};
use crate::models::DonationRequest;

const DONATION_COLUMNS: &str = r#"
    request_id, donor_member_id, blood_type_id, component_id, status, collected_volume,
    unit_id, created_at, approved_at, completed_at, cancelled_at, rejected_at
"#;

impl Database {
    pub fn insert_donation_request(&self, donation: &DonationRequest) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO donation_requests (
                request_id, donor_member_id, blood_type_id, component_id, status, collected_volume,
                unit_id, created_at, approved_at, completed_at, cancelled_at, rejected_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                donation.request_id,
                donation.donor_member_id,
                donation.blood_type_id,
                donation.component_id,
                donation.status.as_str(),
                donation.collected_volume,
                donation.unit_id,
                donation.created_at,
                donation.approved_at,
                donation.completed_at,
                donation.cancelled_at,
                donation.rejected_at,
            ],
        )?;
        Ok(())
    }

    /// Persist status, timestamps and the collection outcome.
    pub fn update_donation_request(&self, donation: &DonationRequest) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE donation_requests SET
                status = ?2,
                collected_volume = ?3,
                unit_id = ?4,
                approved_at = ?5,
                completed_at = ?6,
                cancelled_at = ?7,
                rejected_at = ?8
            WHERE request_id = ?1
            "#,
            params![
                donation.request_id,
                donation.status.as_str(),
                donation.collected_volume,
                donation.unit_id,
                donation.approved_at,
                donation.completed_at,
                donation.cancelled_at,
                donation.rejected_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_donation_request(&self, request_id: &str) -> DbResult<Option<DonationRequest>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM donation_requests WHERE request_id = ?",
                    DONATION_COLUMNS
                ),
                [request_id],
                map_donation_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// A donor's requests, newest first.
    pub fn list_donation_requests_for_donor(
        &self,
        donor_member_id: &str,
    ) -> DbResult<Vec<DonationRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM donation_requests WHERE donor_member_id = ? ORDER BY created_at DESC, request_id",
            DONATION_COLUMNS
        ))?;
        let rows = stmt.query_map([donor_member_id], map_donation_row)?;

        let mut donations = Vec::new();
        for row in rows {
            donations.push(row?.try_into()?);
        }
        Ok(donations)
    }
}

/// Intermediate row struct for database mapping.
struct DonationRow {
    request_id: String,
    donor_member_id: String,
    blood_type_id: i64,
    component_id: i64,
    status: String,
    collected_volume: Option<i64>,
    unit_id: Option<String>,
    created_at: String,
    approved_at: Option<String>,
    completed_at: Option<String>,
    cancelled_at: Option<String>,
    rejected_at: Option<String>,
}

fn map_donation_row(row: &Row<'_>) -> rusqlite::Result<DonationRow> {
    Ok(DonationRow {
        request_id: row.get(0)?,
        donor_member_id: row.get(1)?,
        blood_type_id: row.get(2)?,
        component_id: row.get(3)?,
        status: row.get(4)?,
        collected_volume: row.get(5)?,
        unit_id: row.get(6)?,
        created_at: row.get(7)?,
        approved_at: row.get(8)?,
        completed_at: row.get(9)?,
        cancelled_at: row.get(10)?,
        rejected_at: row.get(11)?,
    })
}

impl TryFrom<DonationRow> for DonationRequest {
    type Error = DbError;

    fn try_from(row: DonationRow) -> Result<Self, Self::Error> {
        Ok(DonationRequest {
            request_id: row.request_id,
            donor_member_id: row.donor_member_id,
            blood_type_id: row.blood_type_id,
            component_id: row.component_id,
            status: parse_request_status(&row.status)?,
            collected_volume: row.collected_volume,
            unit_id: row.unit_id,
            created_at: row.created_at,
            approved_at: row.approved_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            rejected_at: row.rejected_at,
        })
    }
}
