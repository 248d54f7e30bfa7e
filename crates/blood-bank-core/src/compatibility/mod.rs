//! Blood compatibility resolution.
//!
//! Pipeline: Normalization → Reference lookup → Rule precedence → Donor set
//!
//! For each donor type, a rule scoped to the requested component overrides the
//! general (component-less) rule of the same donor/recipient pair.

mod matrix;
mod normalizer;

pub use matrix::*;
pub use normalizer::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::Database;
use crate::models::{BloodComponent, BloodType, CompatibilityRule};

/// Resolver errors.
#[derive(Error, Debug)]
pub enum CompatibilityError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("Unknown blood type: {0}")]
    UnknownBloodType(String),

    #[error("Unknown blood component: {0}")]
    UnknownComponent(String),
}

pub type CompatibilityResult<T> = Result<T, CompatibilityError>;

/// Compatibility query response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityReport {
    pub recipient_blood_type: String,
    pub component: Option<String>,
    pub compatible_blood_types: Vec<String>,
}

/// Resolves which donor blood types are safe for a recipient.
pub struct CompatibilityResolver<'a> {
    db: &'a Database,
    normalizer: ReferenceNormalizer,
}

impl<'a> CompatibilityResolver<'a> {
    /// Create a new resolver.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            normalizer: ReferenceNormalizer::new(),
        }
    }

    /// Look up a blood type by user-entered name.
    pub fn lookup_blood_type(&self, name: &str) -> CompatibilityResult<BloodType> {
        let canonical = self.normalizer.canonical_blood_type(name);
        self.db
            .find_blood_type_by_name(&canonical)?
            .ok_or(CompatibilityError::UnknownBloodType(canonical))
    }

    /// Look up a component by user-entered name or alias.
    pub fn lookup_component(&self, name: &str) -> CompatibilityResult<BloodComponent> {
        let canonical = self.normalizer.canonical_component(name);
        self.db
            .find_component_by_name(&canonical)?
            .ok_or(CompatibilityError::UnknownComponent(canonical))
    }

    /// Donor blood types compatible with a recipient, ascending by id.
    ///
    /// No configured rules yield an empty set, not an error.
    pub fn resolve_compatible_donor_types(
        &self,
        recipient: &str,
        component: Option<&str>,
    ) -> CompatibilityResult<Vec<BloodType>> {
        let recipient = self.lookup_blood_type(recipient)?;
        let component = component.map(|c| self.lookup_component(c)).transpose()?;
        self.resolve_by_id(recipient.id, component.map(|c| c.id))
    }

    /// [`Self::resolve_compatible_donor_types`] over reference ids.
    pub fn resolve_by_id(
        &self,
        recipient_blood_type_id: i64,
        component_id: Option<i64>,
    ) -> CompatibilityResult<Vec<BloodType>> {
        let rules = self
            .db
            .rules_for_recipient(recipient_blood_type_id, component_id)?;
        let verdicts = effective_verdicts(&rules);

        let mut donors = Vec::new();
        for (donor_id, compatible) in verdicts {
            if !compatible {
                continue;
            }
            // Rules reference blood_types by foreign key
            if let Some(blood_type) = self.db.get_blood_type(donor_id)? {
                donors.push(blood_type);
            }
        }

        tracing::debug!(
            recipient_blood_type_id,
            component_id,
            rules = rules.len(),
            donors = donors.len(),
            "resolved compatible donor types"
        );

        Ok(donors)
    }

    /// Whether a single donor type may give to a recipient, same precedence.
    pub fn is_compatible(
        &self,
        donor: &str,
        recipient: &str,
        component: Option<&str>,
    ) -> CompatibilityResult<bool> {
        let donor = self.lookup_blood_type(donor)?;
        let recipient = self.lookup_blood_type(recipient)?;
        let component = component.map(|c| self.lookup_component(c)).transpose()?;
        self.is_compatible_by_id(donor.id, recipient.id, component.map(|c| c.id))
    }

    pub fn is_compatible_by_id(
        &self,
        donor_blood_type_id: i64,
        recipient_blood_type_id: i64,
        component_id: Option<i64>,
    ) -> CompatibilityResult<bool> {
        let rules = self
            .db
            .rules_for_recipient(recipient_blood_type_id, component_id)?;
        Ok(effective_verdicts(&rules)
            .get(&donor_blood_type_id)
            .copied()
            .unwrap_or(false))
    }

    /// Resolve into the `{ compatibleBloodTypes: [...] }` response shape.
    pub fn compatibility_report(
        &self,
        recipient: &str,
        component: Option<&str>,
    ) -> CompatibilityResult<CompatibilityReport> {
        let recipient_type = self.lookup_blood_type(recipient)?;
        let component = component.map(|c| self.lookup_component(c)).transpose()?;
        let donors = self.resolve_by_id(recipient_type.id, component.as_ref().map(|c| c.id))?;

        Ok(CompatibilityReport {
            recipient_blood_type: recipient_type.name,
            component: component.map(|c| c.name),
            compatible_blood_types: donors.into_iter().map(|d| d.name).collect(),
        })
    }
}

/// Winning verdict per donor type: scoped rules beat general ones.
fn effective_verdicts(rules: &[CompatibilityRule]) -> BTreeMap<i64, bool> {
    // donor id → (from scoped rule, compatible)
    let mut winning: BTreeMap<i64, (bool, bool)> = BTreeMap::new();

    for rule in rules {
        let scoped = rule.is_component_scoped();
        match winning.get(&rule.donor_blood_type_id) {
            Some((true, _)) => {}
            Some((false, _)) if !scoped => {}
            _ => {
                winning.insert(rule.donor_blood_type_id, (scoped, rule.is_compatible));
            }
        }
    }

    winning
        .into_iter()
        .map(|(donor, (_, compatible))| (donor, compatible))
        .collect()
}
