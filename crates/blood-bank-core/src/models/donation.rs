//! Donation request models.

use serde::{Deserialize, Serialize};

use super::{now_timestamp, RequestStatus};

/// A donor's request to give blood. Completion produces a blood unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DonationRequest {
    /// UUID
    pub request_id: String,
    pub donor_member_id: String,
    /// Copied from the donor's record at creation
    pub blood_type_id: i64,
    pub component_id: i64,
    pub status: RequestStatus,
    /// Volume in mL, known once collection is complete
    pub collected_volume: Option<i64>,
    /// Unit created on completion
    pub unit_id: Option<String>,
    pub created_at: String,
    pub approved_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub rejected_at: Option<String>,
}

impl DonationRequest {
    pub fn new(donor_member_id: String, blood_type_id: i64, component_id: i64) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            donor_member_id,
            blood_type_id,
            component_id,
            status: RequestStatus::Pending,
            collected_volume: None,
            unit_id: None,
            created_at: now_timestamp(),
            approved_at: None,
            completed_at: None,
            cancelled_at: None,
            rejected_at: None,
        }
    }

    /// Apply a status change and stamp the matching timestamp.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_donation_is_pending() {
        let donation = DonationRequest::new("donor".into(), 1, 1);
        assert_eq!(donation.status, RequestStatus::Pending);
        assert!(donation.unit_id.is_none());
    }

    #[test]
    fn test_cannot_complete_from_pending() {
        let mut donation = DonationRequest::new("donor".into(), 1, 1);
        assert!(!donation.apply_transition(RequestStatus::Completed, "t".into()));
        assert!(donation.apply_transition(RequestStatus::Cancelled, "t".into()));
        assert_eq!(donation.cancelled_at.as_deref(), Some("t"));
    }
}
