//! Available-stock queries.

use chrono::{DateTime, Utc};

use super::{InventoryLedger, LedgerResult};
use crate::models::{AvailabilitySummary, BloodUnit};

impl<'a> InventoryLedger<'a> {
    /// Assignable units of a type, first-expiring first.
    pub fn list_available_units(
        &self,
        blood_type: &str,
        component: Option<&str>,
    ) -> LedgerResult<Vec<BloodUnit>> {
        self.list_available_units_at(blood_type, component, Utc::now())
    }

    pub fn list_available_units_at(
        &self,
        blood_type: &str,
        component: Option<&str>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<BloodUnit>> {
        let blood_type = self.resolver.lookup_blood_type(blood_type)?;
        let component = component
            .map(|c| self.resolver.lookup_component(c))
            .transpose()?;

        let units = self.db.query_available_units(
            blood_type.id,
            component.map(|c| c.id),
            self.expiry_cutoff(now).as_deref(),
        )?;
        tracing::debug!(blood_type = %blood_type.name, units = units.len(), "listed available units");
        Ok(units)
    }

    /// Unit count and total remaining volume of [`Self::list_available_units`].
    pub fn available_summary(
        &self,
        blood_type: &str,
        component: Option<&str>,
    ) -> LedgerResult<AvailabilitySummary> {
        self.available_summary_at(blood_type, component, Utc::now())
    }

    pub fn available_summary_at(
        &self,
        blood_type: &str,
        component: Option<&str>,
        now: DateTime<Utc>,
    ) -> LedgerResult<AvailabilitySummary> {
        let blood_type = self.resolver.lookup_blood_type(blood_type)?;
        let component = component
            .map(|c| self.resolver.lookup_component(c))
            .transpose()?;
        self.summarize(
            blood_type.id,
            blood_type.name,
            component.map(|c| c.id),
            now,
        )
    }

    /// Available stock for every donor type compatible with the recipient,
    /// in resolver order. Types without stock are reported with zeros.
    pub fn available_compatible_inventory(
        &self,
        recipient: &str,
        component: Option<&str>,
    ) -> LedgerResult<Vec<AvailabilitySummary>> {
        self.available_compatible_inventory_at(recipient, component, Utc::now())
    }

    pub fn available_compatible_inventory_at(
        &self,
        recipient: &str,
        component: Option<&str>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<AvailabilitySummary>> {
        let recipient = self.resolver.lookup_blood_type(recipient)?;
        let component_id = component
            .map(|c| self.resolver.lookup_component(c))
            .transpose()?
            .map(|c| c.id);

        let donors = self.resolver.resolve_by_id(recipient.id, component_id)?;
        donors
            .into_iter()
            .map(|donor| self.summarize(donor.id, donor.name, component_id, now))
            .collect()
    }

    fn summarize(
        &self,
        blood_type_id: i64,
        blood_type: String,
        component_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> LedgerResult<AvailabilitySummary> {
        let totals = self.db.available_totals(
            blood_type_id,
            component_id,
            self.expiry_cutoff(now).as_deref(),
        )?;
        Ok(AvailabilitySummary {
            blood_type,
            units: totals.units,
            total_volume: totals.remaining_volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::compatibility::seed_standard_reference_data;
    use crate::db::Database;
    use crate::inventory::{InventoryLedger, LedgerError};
    use crate::models::Member;
    use chrono::{Duration, TimeZone, Utc};

    fn setup() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        seed_standard_reference_data(&db).unwrap();
        let donor = Member::new("Donor".into(), None);
        db.insert_member(&donor).unwrap();
        (db, donor.member_id)
    }

    #[test]
    fn test_available_units_ordered_by_expiry() {
        let (db, donor) = setup();
        let ledger = InventoryLedger::new(&db);
        let now = Utc::now();

        let late = ledger.create_unit_at("A-", "Whole Blood", &donor, 450, now).unwrap();
        let early = ledger
            .create_unit_at("A-", "Whole Blood", &donor, 300, now - Duration::days(3))
            .unwrap();
        ledger.create_unit_at("A-", "Plasma", &donor, 200, now).unwrap();

        let units = ledger.list_available_units("a neg", Some("wb")).unwrap();
        let ids: Vec<_> = units.iter().map(|u| u.unit_id.clone()).collect();
        assert_eq!(ids, vec![early.unit_id, late.unit_id]);

        assert_eq!(ledger.list_available_units("A-", None).unwrap().len(), 3);

        let summary = ledger.available_summary("A-", Some("Whole Blood")).unwrap();
        assert_eq!(summary.units, 2);
        assert_eq!(summary.total_volume, 750);
    }

    #[test]
    fn test_expired_units_hidden_only_when_enforced() {
        let (db, donor) = setup();
        let added = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ledger = InventoryLedger::new(&db);
        ledger.create_unit_at("B-", "Platelets", &donor, 250, added).unwrap();

        let after_expiry = added + Duration::days(6);
        assert!(ledger
            .list_available_units_at("B-", None, after_expiry)
            .unwrap()
            .is_empty());

        let lenient = InventoryLedger::new(&db).with_enforce_expiry(false);
        assert_eq!(
            lenient.list_available_units_at("B-", None, after_expiry).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_compatible_inventory_reports_zero_rows() {
        let (db, donor) = setup();
        let ledger = InventoryLedger::new(&db);
        ledger.create_unit("O-", "Red Blood Cells", &donor, 300).unwrap();
        ledger.create_unit("O-", "Red Blood Cells", &donor, 250).unwrap();
        ledger.create_unit("A+", "Red Blood Cells", &donor, 300).unwrap();

        let inventory = ledger
            .available_compatible_inventory("A+", Some("Red Blood Cells"))
            .unwrap();
        let rows: Vec<_> = inventory
            .iter()
            .map(|s| (s.blood_type.as_str(), s.units, s.total_volume))
            .collect();
        assert_eq!(
            rows,
            vec![("O-", 2, 550), ("O+", 0, 0), ("A-", 0, 0), ("A+", 1, 300)]
        );
    }

    #[test]
    fn test_unknown_names_are_not_found() {
        let (db, _) = setup();
        let ledger = InventoryLedger::new(&db);
        assert!(matches!(
            ledger.available_compatible_inventory("Z-", None),
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            ledger.list_available_units("O-", Some("Cryo")),
            Err(LedgerError::NotFound(_))
        ));
    }
}
