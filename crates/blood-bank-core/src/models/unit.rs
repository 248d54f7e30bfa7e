//! Blood unit models and the unit status state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{format_timestamp, parse_timestamp};

/// Lifecycle status of a blood unit.
///
/// `Available` is initial, `Removed` is terminal, nothing returns to `Available`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    /// In stock and assignable
    Available,
    /// Fully consumed or manually marked as used
    Used,
    /// Discarded; remaining volume forced to 0
    Removed,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "available",
            UnitStatus::Used => "used",
            UnitStatus::Removed => "removed",
        }
    }

    /// Parse the stored (snake_case) or display (any case) form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "available" => Some(UnitStatus::Available),
            "used" => Some(UnitStatus::Used),
            "removed" | "expired" => Some(UnitStatus::Removed),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is an allowed transition.
    pub fn can_transition_to(&self, next: UnitStatus) -> bool {
        matches!(
            (self, next),
            (UnitStatus::Available, UnitStatus::Used)
                | (UnitStatus::Available, UnitStatus::Removed)
                | (UnitStatus::Used, UnitStatus::Removed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UnitStatus::Removed)
    }
}

/// A discrete collected quantity of one component from one donation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BloodUnit {
    /// UUID
    pub unit_id: String,
    pub blood_type_id: i64,
    pub component_id: i64,
    pub donor_member_id: String,
    /// Collected volume in mL
    pub volume: i64,
    /// Volume still unassigned in mL (0 ≤ remaining ≤ volume)
    pub remaining_volume: i64,
    pub status: UnitStatus,
    pub add_date: String,
    pub expiry_date: String,
    /// Optimistic-lock counter, bumped on every write
    pub version: i64,
    pub updated_at: String,
}

impl BloodUnit {
    /// Create a freshly collected unit.
    ///
    /// Expiry is `added_at + shelf_life_days`.
    pub fn new(
        blood_type_id: i64,
        component_id: i64,
        donor_member_id: String,
        volume: i64,
        shelf_life_days: i64,
        added_at: DateTime<Utc>,
    ) -> Self {
        let add_date = format_timestamp(added_at);
        Self {
            unit_id: uuid::Uuid::new_v4().to_string(),
            blood_type_id,
            component_id,
            donor_member_id,
            volume,
            remaining_volume: volume,
            status: UnitStatus::Available,
            add_date: add_date.clone(),
            expiry_date: format_timestamp(added_at + Duration::days(shelf_life_days)),
            version: 0,
            updated_at: add_date,
        }
    }

    /// Expiry as an instant, if the stored value parses.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.expiry_date)
    }

    /// Whether the unit's expiry has been reached at `now`.
    ///
    /// An unparseable expiry counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(true, |expiry| expiry <= now)
    }

    /// Whether the unit can still be assigned to a request at `now`.
    pub fn is_assignable_at(&self, now: DateTime<Utc>, enforce_expiry: bool) -> bool {
        self.status == UnitStatus::Available
            && self.remaining_volume > 0
            && (!enforce_expiry || !self.is_expired_at(now))
    }
}

/// Partial update of a unit's mutable fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitUpdate {
    pub status: Option<UnitStatus>,
    pub remaining_volume: Option<i64>,
    /// Component reclassification, by name
    pub component: Option<String>,
}

impl UnitUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.remaining_volume.is_none() && self.component.is_none()
    }
}

/// Aggregated available inventory for one blood type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySummary {
    pub blood_type: String,
    pub units: u32,
    pub total_volume: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_allowed_transitions() {
        assert!(UnitStatus::Available.can_transition_to(UnitStatus::Used));
        assert!(UnitStatus::Available.can_transition_to(UnitStatus::Removed));
        assert!(UnitStatus::Used.can_transition_to(UnitStatus::Removed));
    }

    #[test]
    fn test_no_transition_back_to_available() {
        assert!(!UnitStatus::Used.can_transition_to(UnitStatus::Available));
        assert!(!UnitStatus::Removed.can_transition_to(UnitStatus::Available));
        assert!(!UnitStatus::Removed.can_transition_to(UnitStatus::Used));
        assert!(!UnitStatus::Available.can_transition_to(UnitStatus::Available));
        assert!(UnitStatus::Removed.is_terminal());
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(UnitStatus::parse("Available"), Some(UnitStatus::Available));
        assert_eq!(UnitStatus::parse("expired"), Some(UnitStatus::Removed));
        assert_eq!(UnitStatus::parse("reserved"), None);
    }

    #[test]
    fn test_new_unit_expiry() {
        let added = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
        let unit = BloodUnit::new(1, 4, "donor".into(), 450, 5, added);

        assert_eq!(unit.remaining_volume, 450);
        assert_eq!(unit.status, UnitStatus::Available);
        assert_eq!(unit.add_date, "2026-01-01T08:00:00Z");
        assert_eq!(unit.expiry_date, "2026-01-06T08:00:00Z");
        assert!(!unit.is_expired_at(added));
        assert!(unit.is_expired_at(added + Duration::days(5)));
    }

    #[test]
    fn test_assignable() {
        let added = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
        let mut unit = BloodUnit::new(1, 1, "donor".into(), 450, 35, added);
        let later = added + Duration::days(40);

        assert!(unit.is_assignable_at(added, true));
        assert!(!unit.is_assignable_at(later, true));
        assert!(unit.is_assignable_at(later, false));

        unit.remaining_volume = 0;
        assert!(!unit.is_assignable_at(added, true));
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = AvailabilitySummary {
            blood_type: "O-".into(),
            units: 2,
            total_volume: 900,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(json, r#"{"bloodType":"O-","units":2,"totalVolume":900}"#);
    }
}
