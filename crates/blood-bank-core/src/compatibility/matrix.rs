//! Standard ABO/Rh reference data and compatibility matrix.
//!
//! General rules follow red-cell compatibility: every antigen on the donor's
//! cells must also be on the recipient's. Plasma-scoped rules follow plasma
//! compatibility: the donor's plasma must not carry antibodies against the
//! recipient's ABO antigens, and Rh does not apply.

use crate::db::{Database, DbError, DbResult};

/// Standard blood types in id order.
pub const STANDARD_BLOOD_TYPES: [&str; 8] = ["O-", "O+", "A-", "A+", "B-", "B+", "AB-", "AB+"];

/// Standard components with shelf life in days, in id order.
pub const STANDARD_COMPONENTS: [(&str, i64); 4] = [
    ("Whole Blood", 35),
    ("Red Blood Cells", 42),
    ("Plasma", 365),
    ("Platelets", 5),
];

/// Component whose rules are written as scoped overrides.
pub const PLASMA: &str = "Plasma";

/// What the standard seeding wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub blood_types: u32,
    pub components: u32,
    pub rules_inserted: u32,
}

/// Antigens carried on red cells: (A, B, RhD).
fn antigens(blood_type: &str) -> Option<(bool, bool, bool)> {
    let (group, rh) = if let Some(group) = blood_type.strip_suffix('+') {
        (group, true)
    } else {
        (blood_type.strip_suffix('-')?, false)
    };
    match group {
        "O" => Some((false, false, rh)),
        "A" => Some((true, false, rh)),
        "B" => Some((false, true, rh)),
        "AB" => Some((true, true, rh)),
        _ => None,
    }
}

/// Donor red cells are safe for the recipient.
pub fn red_cell_compatible(donor: &str, recipient: &str) -> bool {
    match (antigens(donor), antigens(recipient)) {
        (Some((da, db, drh)), Some((ra, rb, rrh))) => {
            (!da || ra) && (!db || rb) && (!drh || rrh)
        }
        _ => false,
    }
}

/// Donor plasma is safe for the recipient.
pub fn plasma_compatible(donor: &str, recipient: &str) -> bool {
    match (antigens(donor), antigens(recipient)) {
        (Some((da, db, _)), Some((ra, rb, _))) => (!ra || da) && (!rb || db),
        _ => false,
    }
}

/// Install the standard blood types, components and rules.
///
/// Existing rows are kept: re-seeding never overwrites a customised rule.
pub fn seed_standard_reference_data(db: &Database) -> DbResult<SeedSummary> {
    db.atomically(|db| {
        let mut type_ids = Vec::with_capacity(STANDARD_BLOOD_TYPES.len());
        for (id, name) in (1..).zip(STANDARD_BLOOD_TYPES) {
            let blood_type = db.ensure_blood_type(id, name)?;
            type_ids.push((name, blood_type.id));
        }
        let mut plasma = None;
        for (id, (name, shelf_life_days)) in (1..).zip(STANDARD_COMPONENTS) {
            let component = db.ensure_component(id, name, shelf_life_days)?;
            if name == PLASMA {
                plasma = Some(component);
            }
        }
        let plasma = plasma.ok_or_else(|| DbError::NotFound(format!("component {}", PLASMA)))?;

        let mut rules_inserted = 0;
        for (donor, donor_id) in &type_ids {
            for (recipient, recipient_id) in &type_ids {
                if db.ensure_rule(*donor_id, *recipient_id, None, red_cell_compatible(donor, recipient))? {
                    rules_inserted += 1;
                }
                if db.ensure_rule(
                    *donor_id,
                    *recipient_id,
                    Some(plasma.id),
                    plasma_compatible(donor, recipient),
                )? {
                    rules_inserted += 1;
                }
            }
        }

        tracing::info!(rules_inserted, "seeded standard reference data");

        Ok(SeedSummary {
            blood_types: STANDARD_BLOOD_TYPES.len() as u32,
            components: STANDARD_COMPONENTS.len() as u32,
            rules_inserted,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_red_cell_universal_donor_and_recipient() {
        for recipient in STANDARD_BLOOD_TYPES {
            assert!(red_cell_compatible("O-", recipient), "O- -> {}", recipient);
        }
        for donor in STANDARD_BLOOD_TYPES {
            assert!(red_cell_compatible(donor, "AB+"), "{} -> AB+", donor);
        }
    }

    #[test]
    fn test_red_cell_rh_negative_recipient() {
        assert!(red_cell_compatible("A-", "A-"));
        assert!(!red_cell_compatible("A+", "A-"));
        assert!(!red_cell_compatible("O+", "O-"));
        assert!(!red_cell_compatible("B-", "A-"));
    }

    #[test]
    fn test_red_cell_counts() {
        let donors_for = |recipient: &str| {
            STANDARD_BLOOD_TYPES
                .iter()
                .filter(|d| red_cell_compatible(d, recipient))
                .count()
        };
        assert_eq!(donors_for("O-"), 1);
        assert_eq!(donors_for("O+"), 2);
        assert_eq!(donors_for("A+"), 4);
        assert_eq!(donors_for("AB-"), 4);
        assert_eq!(donors_for("AB+"), 8);
    }

    #[test]
    fn test_plasma_is_reversed() {
        for recipient in STANDARD_BLOOD_TYPES {
            assert!(plasma_compatible("AB+", recipient));
            assert!(plasma_compatible("AB-", recipient));
        }
        assert!(plasma_compatible("O+", "O-"));
        assert!(!plasma_compatible("O-", "A+"));
        assert!(plasma_compatible("A-", "O+"));
        assert!(!plasma_compatible("A+", "B+"));
    }

    #[test]
    fn test_unknown_type_never_compatible() {
        assert!(!red_cell_compatible("C+", "AB+"));
        assert!(!plasma_compatible("AB+", ""));
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();

        let first = seed_standard_reference_data(&db).unwrap();
        assert_eq!(first.rules_inserted, 128);

        let second = seed_standard_reference_data(&db).unwrap();
        assert_eq!(second.rules_inserted, 0);
        assert_eq!(db.list_rules().unwrap().len(), 128);
        assert_eq!(db.list_blood_types().unwrap().len(), 8);
        assert_eq!(db.list_components().unwrap().len(), 4);
    }

    #[test]
    fn test_seed_tolerates_preexisting_names() {
        let db = Database::open_in_memory().unwrap();
        let ab_pos = db.insert_blood_type("AB+").unwrap();

        let summary = seed_standard_reference_data(&db).unwrap();
        assert_eq!(summary.rules_inserted, 128);
        assert_eq!(db.list_blood_types().unwrap().len(), 8);
        assert_eq!(db.find_blood_type_by_name("AB+").unwrap().unwrap(), ab_pos);

        let universal = crate::compatibility::CompatibilityResolver::new(&db)
            .resolve_compatible_donor_types("AB+", Some("Whole Blood"))
            .unwrap();
        assert_eq!(universal.len(), 8);
    }

    #[test]
    fn test_seed_keeps_custom_rules() {
        let db = Database::open_in_memory().unwrap();
        seed_standard_reference_data(&db).unwrap();

        // O- → O- whole blood locally disabled
        db.upsert_rule(1, 1, None, false).unwrap();
        seed_standard_reference_data(&db).unwrap();

        let rules = db.rules_for_recipient(1, None).unwrap();
        let o_neg = rules.iter().find(|r| r.donor_blood_type_id == 1).unwrap();
        assert!(!o_neg.is_compatible);
    }
}
