//! Member (donor / recipient) models.

use serde::{Deserialize, Serialize};

use super::now_timestamp;

/// A person known to the blood bank. Donors and recipients are both members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    /// UUID, generated locally
    pub member_id: String,
    pub full_name: String,
    /// Recorded blood type, if typed
    pub blood_type_id: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Completion time of the member's latest donation
    pub last_donation_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Member {
    /// Create a new member with required fields.
    pub fn new(full_name: String, blood_type_id: Option<i64>) -> Self {
        let now = now_timestamp();
        Self {
            member_id: uuid::Uuid::new_v4().to_string(),
            full_name,
            blood_type_id,
            email: None,
            phone: None,
            last_donation_at: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_member() {
        let member = Member::new("Ada Donor".into(), Some(2));
        assert_eq!(member.full_name, "Ada Donor");
        assert_eq!(member.blood_type_id, Some(2));
        assert!(member.last_donation_at.is_none());
        assert_eq!(member.member_id.len(), 36);
    }
}
