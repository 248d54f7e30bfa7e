//! Transfusion request models and the shared request lifecycle.

use serde::{Deserialize, Serialize};

use super::now_timestamp;

/// Lifecycle status shared by transfusion and donation requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "completed" => Some(RequestStatus::Completed),
            "cancelled" | "canceled" => Some(RequestStatus::Cancelled),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    /// Pending → Approved | Rejected | Cancelled, Approved → Completed | Cancelled.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Pending, RequestStatus::Cancelled)
                | (RequestStatus::Approved, RequestStatus::Completed)
                | (RequestStatus::Approved, RequestStatus::Cancelled)
        )
    }

    /// Open requests still accept unit assignments.
    pub fn is_open(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Approved)
    }
}

/// A clinical request for blood, fulfilled by assigning blood units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransfusionRequest {
    /// UUID
    pub request_id: String,
    pub recipient_member_id: String,
    pub blood_type_id: i64,
    pub component_id: i64,
    /// Requested volume in mL
    pub requested_volume: i64,
    pub status: RequestStatus,
    pub notes: Option<String>,
    pub requested_at: String,
    pub approved_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub rejected_at: Option<String>,
}

impl TransfusionRequest {
    /// Create a new pending request.
    pub fn new(
        recipient_member_id: String,
        blood_type_id: i64,
        component_id: i64,
        requested_volume: i64,
    ) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            recipient_member_id,
            blood_type_id,
            component_id,
            requested_volume,
            status: RequestStatus::Pending,
            notes: None,
            requested_at: now_timestamp(),
            approved_at: None,
            completed_at: None,
            cancelled_at: None,
            rejected_at: None,
        }
    }

    /// Apply a status change and stamp the matching timestamp.
    ///
    /// Returns `false` (and leaves the request untouched) for disallowed moves.
    pub fn apply_transition(&mut self, next: RequestStatus, at: String) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        match next {
            RequestStatus::Approved => self.approved_at = Some(at),
            RequestStatus::Completed => self.completed_at = Some(at),
            RequestStatus::Cancelled => self.cancelled_at = Some(at),
            RequestStatus::Rejected => self.rejected_at = Some(at),
            RequestStatus::Pending => {}
        }
        self.status = next;
        true
    }
}

/// Status of one unit's allocation to a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    /// Volume reserved for the request
    Assigned,
    /// Request completed, volume given to the recipient
    Transfused,
    /// Request cancelled after assignment
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Transfused => "transfused",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assigned" => Some(AssignmentStatus::Assigned),
            "transfused" => Some(AssignmentStatus::Transfused),
            "cancelled" => Some(AssignmentStatus::Cancelled),
            _ => None,
        }
    }
}

/// Which unit (and how much of it) was allocated to a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransfusionRequestBloodUnit {
    pub request_id: String,
    pub unit_id: String,
    pub assigned_volume: i64,
    pub status: AssignmentStatus,
    pub assigned_at: String,
}

/// How much of a request's volume has been covered by assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationProgress {
    pub requested: i64,
    pub assigned: i64,
    pub outstanding: i64,
}

impl AllocationProgress {
    pub fn new(requested: i64, assigned: i64) -> Self {
        Self {
            requested,
            assigned,
            outstanding: (requested - assigned).max(0),
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.outstanding == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_transitions() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Completed));
        assert!(Approved.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn test_apply_transition_stamps_time() {
        let mut request = TransfusionRequest::new("recipient".into(), 1, 2, 300);
        assert!(request.apply_transition(RequestStatus::Approved, "t1".into()));
        assert_eq!(request.approved_at.as_deref(), Some("t1"));

        assert!(!request.apply_transition(RequestStatus::Rejected, "t2".into()));
        assert!(request.rejected_at.is_none());
        assert_eq!(request.status, RequestStatus::Approved);

        assert!(request.apply_transition(RequestStatus::Completed, "t3".into()));
        assert_eq!(request.completed_at.as_deref(), Some("t3"));
    }

    #[test]
    fn test_allocation_progress() {
        let progress = AllocationProgress::new(500, 450);
        assert_eq!(progress.outstanding, 50);
        assert!(!progress.is_fulfilled());

        let over = AllocationProgress::new(500, 600);
        assert_eq!(over.outstanding, 0);
        assert!(over.is_fulfilled());
    }
}
