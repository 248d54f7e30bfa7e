//! Transfusion request and unit assignment database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{AssignmentStatus, RequestStatus, TransfusionRequest, TransfusionRequestBloodUnit};

const REQUEST_COLUMNS: &str = r#"
    request_id, recipient_member_id, blood_type_id, component_id, requested_volume,
    status, notes, requested_at, approved_at, completed_at, cancelled_at, rejected_at
"#;

impl Database {
    // =========================================================================
    // Transfusion Requests
    // =========================================================================

    pub fn insert_transfusion_request(&self, request: &TransfusionRequest) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO transfusion_requests (
                request_id, recipient_member_id, blood_type_id, component_id, requested_volume,
                status, notes, requested_at, approved_at, completed_at, cancelled_at, rejected_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                request.request_id,
                request.recipient_member_id,
                request.blood_type_id,
                request.component_id,
                request.requested_volume,
                request.status.as_str(),
                request.notes,
                request.requested_at,
                request.approved_at,
                request.completed_at,
                request.cancelled_at,
                request.rejected_at,
            ],
        )?;
        Ok(())
    }

    /// Persist a request's status and transition timestamps.
    pub fn update_transfusion_request_status(&self, request: &TransfusionRequest) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE transfusion_requests SET
                status = ?2,
                approved_at = ?3,
                completed_at = ?4,
                cancelled_at = ?5,
                rejected_at = ?6
            WHERE request_id = ?1
            "#,
            params![
                request.request_id,
                request.status.as_str(),
                request.approved_at,
                request.completed_at,
                request.cancelled_at,
                request.rejected_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_transfusion_request(&self, request_id: &str) -> DbResult<Option<TransfusionRequest>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM transfusion_requests WHERE request_id = ?",
                    REQUEST_COLUMNS
                ),
                [request_id],
                map_request_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Requests in a status, oldest first.
    pub fn list_transfusion_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> DbResult<Vec<TransfusionRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM transfusion_requests WHERE status = ? ORDER BY requested_at, request_id",
            REQUEST_COLUMNS
        ))?;
        let rows = stmt.query_map([status.as_str()], map_request_row)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?.try_into()?);
        }
        Ok(requests)
    }

    // =========================================================================
    // Assignments
    // =========================================================================

    pub fn insert_assignment(&self, assignment: &TransfusionRequestBloodUnit) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO transfusion_request_units (
                request_id, unit_id, assigned_volume, status, assigned_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                assignment.request_id,
                assignment.unit_id,
                assignment.assigned_volume,
                assignment.status.as_str(),
                assignment.assigned_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_assignment(
        &self,
        request_id: &str,
        unit_id: &str,
    ) -> DbResult<Option<TransfusionRequestBloodUnit>> {
        self.conn
            .query_row(
                r#"
                SELECT request_id, unit_id, assigned_volume, status, assigned_at
                FROM transfusion_request_units
                WHERE request_id = ?1 AND unit_id = ?2
                "#,
                params![request_id, unit_id],
                map_assignment_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Assignments of a request in assignment order.
    pub fn list_assignments_for_request(
        &self,
        request_id: &str,
    ) -> DbResult<Vec<TransfusionRequestBloodUnit>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT request_id, unit_id, assigned_volume, status, assigned_at
            FROM transfusion_request_units
            WHERE request_id = ?
            ORDER BY assigned_at, rowid
            "#,
        )?;
        let rows = stmt.query_map([request_id], map_assignment_row)?;

        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(row?.try_into()?);
        }
        Ok(assignments)
    }

    /// Volume assigned to a request, excluding cancelled assignments.
    pub fn assigned_volume_for_request(&self, request_id: &str) -> DbResult<i64> {
        let total: i64 = self.conn.query_row(
            r#"
            SELECT COALESCE(SUM(assigned_volume), 0)
            FROM transfusion_request_units
            WHERE request_id = ? AND status <> 'cancelled'
            "#,
            [request_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Move every assignment of a request from one status to another.
    pub fn set_assignment_status_for_request(
        &self,
        request_id: &str,
        from: AssignmentStatus,
        to: AssignmentStatus,
    ) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            "UPDATE transfusion_request_units SET status = ?3 WHERE request_id = ?1 AND status = ?2",
            params![request_id, from.as_str(), to.as_str()],
        )?;
        Ok(rows_affected)
    }
}

/// Intermediate row struct for database mapping.
struct RequestRow {
    request_id: String,
    recipient_member_id: String,
    blood_type_id: i64,
    component_id: i64,
    requested_volume: i64,
    status: String,
    notes: Option<String>,
    requested_at: String,
    approved_at: Option<String>,
    completed_at: Option<String>,
    cancelled_at: Option<String>,
    rejected_at: Option<String>,
}

fn map_request_row(row: &Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        request_id: row.get(0)?,
        recipient_member_id: row.get(1)?,
        blood_type_id: row.get(2)?,
        component_id: row.get(3)?,
        requested_volume: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
        requested_at: row.get(7)?,
        approved_at: row.get(8)?,
        completed_at: row.get(9)?,
        cancelled_at: row.get(10)?,
        rejected_at: row.get(11)?,
    })
}

impl TryFrom<RequestRow> for TransfusionRequest {
    type Error = DbError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(TransfusionRequest {
            request_id: row.request_id,
            recipient_member_id: row.recipient_member_id,
            blood_type_id: row.blood_type_id,
            component_id: row.component_id,
            requested_volume: row.requested_volume,
            status: parse_request_status(&row.status)?,
            notes: row.notes,
            requested_at: row.requested_at,
            approved_at: row.approved_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            rejected_at: row.rejected_at,
        })
    }
}

struct AssignmentRow {
    request_id: String,
    unit_id: String,
    assigned_volume: i64,
    status: String,
    assigned_at: String,
}

fn map_assignment_row(row: &Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        request_id: row.get(0)?,
        unit_id: row.get(1)?,
        assigned_volume: row.get(2)?,
        status: row.get(3)?,
        assigned_at: row.get(4)?,
    })
}

impl TryFrom<AssignmentRow> for TransfusionRequestBloodUnit {
    type Error = DbError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let status = AssignmentStatus::parse(&row.status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown assignment status: {}", row.status))
        })?;
        Ok(TransfusionRequestBloodUnit {
            request_id: row.request_id,
            unit_id: row.unit_id,
            assigned_volume: row.assigned_volume,
            status,
            assigned_at: row.assigned_at,
        })
    }
}

pub(crate) fn parse_request_status(s: &str) -> Result<RequestStatus, DbError> {
    RequestStatus::parse(s)
        .ok_or_else(|| DbError::Constraint(format!("Unknown request status: {}", s)))
}
