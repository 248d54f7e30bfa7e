//! Reference data: blood types, components and compatibility rules.

use serde::{Deserialize, Serialize};

/// ABO/Rh blood type (e.g. "O-", "AB+").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BloodType {
    pub id: i64,
    /// Canonical name, unique
    pub name: String,
}

/// Fractionated blood product with its storage shelf life.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BloodComponent {
    pub id: i64,
    /// Canonical name, unique (e.g. "Plasma")
    pub name: String,
    /// Days a unit of this component stays usable after collection
    pub shelf_life_days: i64,
}

/// A directed donor → recipient safety assertion, optionally scoped to a component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompatibilityRule {
    pub id: i64,
    pub donor_blood_type_id: i64,
    pub recipient_blood_type_id: i64,
    /// `None` for the general rule of the pair
    pub component_id: Option<i64>,
    pub is_compatible: bool,
}

impl CompatibilityRule {
    /// Whether this rule only applies to one component.
    pub fn is_component_scoped(&self) -> bool {
        self.component_id.is_some()
    }
}
