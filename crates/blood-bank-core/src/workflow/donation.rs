//! Donation request lifecycle. Completing a donation produces a blood unit.

use chrono::Utc;

use super::{illegal_transition, positive_volume, RequestWorkflow};
use crate::db::DbError;
use crate::inventory::{invalid_reference, log_rejection, LedgerError, LedgerResult};
use crate::models::{format_timestamp, now_timestamp, DonationRequest, RequestStatus};

impl<'a> RequestWorkflow<'a> {
    /// Open a pending donation. The donor's recorded blood type is copied.
    pub fn create_donation_request(
        &self,
        donor_member_id: &str,
        component: &str,
    ) -> LedgerResult<DonationRequest> {
        self.db
            .atomically(|db| {
                let component = self
                    .ledger
                    .resolver()
                    .lookup_component(component)
                    .map_err(invalid_reference)?;
                let donor = db.get_member(donor_member_id)?.ok_or_else(|| {
                    LedgerError::Validation(format!("unknown donor member {}", donor_member_id))
                })?;
                let blood_type_id = donor.blood_type_id.ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "donor {} has no recorded blood type",
                        donor_member_id
                    ))
                })?;

                let donation = DonationRequest::new(donor.member_id, blood_type_id, component.id);
                db.insert_donation_request(&donation)?;
                Ok(donation)
            })
            .inspect(|donation| {
                tracing::info!(request_id = %donation.request_id, "created donation request")
            })
            .inspect_err(|e| log_rejection("create_donation_request", donor_member_id, e))
    }

    pub fn get_donation_request(&self, request_id: &str) -> LedgerResult<DonationRequest> {
        self.db
            .get_donation_request(request_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("donation request {}", request_id)))
    }

    pub fn approve_donation_request(&self, request_id: &str) -> LedgerResult<DonationRequest> {
        self.transition_donation(request_id, RequestStatus::Approved)
    }

    pub fn reject_donation_request(&self, request_id: &str) -> LedgerResult<DonationRequest> {
        self.transition_donation(request_id, RequestStatus::Rejected)
    }

    pub fn cancel_donation_request(&self, request_id: &str) -> LedgerResult<DonationRequest> {
        self.transition_donation(request_id, RequestStatus::Cancelled)
    }

    /// Record the collection of an approved donation.
    ///
    /// Creates the unit through the ledger, links it to the request and stamps
    /// the donor's last donation, all in one unit of work.
    pub fn complete_donation(
        &self,
        request_id: &str,
        collected_volume: i64,
    ) -> LedgerResult<DonationRequest> {
        self.db
            .atomically(|db| {
                positive_volume(collected_volume, "collected volume")?;
                let mut donation = db.get_donation_request(request_id)?.ok_or_else(|| {
                    LedgerError::NotFound(format!("donation request {}", request_id))
                })?;

                let collected_at = Utc::now();
                let previous = donation.status;
                if !donation.apply_transition(RequestStatus::Completed, format_timestamp(collected_at)) {
                    return Err(illegal_transition(previous, RequestStatus::Completed));
                }

                let blood_type = db.get_blood_type(donation.blood_type_id)?.ok_or_else(|| {
                    DbError::NotFound(format!("blood type {}", donation.blood_type_id))
                })?;
                let component = db.get_component(donation.component_id)?.ok_or_else(|| {
                    DbError::NotFound(format!("blood component {}", donation.component_id))
                })?;
                let unit = self.ledger.create_unit_at(
                    &blood_type.name,
                    &component.name,
                    &donation.donor_member_id,
                    collected_volume,
                    collected_at,
                )?;

                donation.collected_volume = Some(collected_volume);
                donation.unit_id = Some(unit.unit_id);
                db.update_donation_request(&donation)?;
                db.record_member_donation(&donation.donor_member_id, &unit.add_date)?;
                Ok(donation)
            })
            .inspect(|donation| {
                tracing::info!(
                    request_id = %donation.request_id,
                    unit_id = donation.unit_id.as_deref().unwrap_or_default(),
                    "completed donation"
                )
            })
            .inspect_err(|e| log_rejection("complete_donation", request_id, e))
    }

    fn transition_donation(
        &self,
        request_id: &str,
        next: RequestStatus,
    ) -> LedgerResult<DonationRequest> {
        self.db
            .atomically(|db| {
                let mut donation = db.get_donation_request(request_id)?.ok_or_else(|| {
                    LedgerError::NotFound(format!("donation request {}", request_id))
                })?;
                let previous = donation.status;
                if !donation.apply_transition(next, now_timestamp()) {
                    return Err(illegal_transition(previous, next));
                }
                db.update_donation_request(&donation)?;
                Ok(donation)
            })
            .inspect(|donation| {
                tracing::info!(
                    request_id = %donation.request_id,
                    status = donation.status.as_str(),
                    "donation request status changed"
                )
            })
            .inspect_err(|e| log_rejection("transition_donation_request", request_id, e))
    }
}

#[cfg(test)]
mod tests {
    use crate::compatibility::seed_standard_reference_data;
    use crate::db::Database;
    use crate::inventory::LedgerError;
    use crate::models::{Member, RequestStatus, UnitStatus};
    use crate::workflow::RequestWorkflow;

    fn setup() -> (Database, Member) {
        let db = Database::open_in_memory().unwrap();
        seed_standard_reference_data(&db).unwrap();
        let donor = Member::new("Donor".into(), Some(2));
        db.insert_member(&donor).unwrap();
        (db, donor)
    }

    #[test]
    fn test_donor_must_be_typed() {
        let (db, _) = setup();
        let untyped = Member::new("Walk-in".into(), None);
        db.insert_member(&untyped).unwrap();
        let workflow = RequestWorkflow::new(&db);

        assert!(matches!(
            workflow.create_donation_request(&untyped.member_id, "Whole Blood"),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            workflow.create_donation_request("nobody", "Whole Blood"),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_complete_donation_creates_unit() {
        let (db, donor) = setup();
        let workflow = RequestWorkflow::new(&db);
        let donation = workflow.create_donation_request(&donor.member_id, "FFP").unwrap();
        assert_eq!(donation.blood_type_id, 2);
        assert_eq!(donation.component_id, 3);

        assert!(matches!(
            workflow.complete_donation(&donation.request_id, 250),
            Err(LedgerError::InvalidStateTransition { .. })
        ));
        workflow.approve_donation_request(&donation.request_id).unwrap();
        assert!(matches!(
            workflow.complete_donation(&donation.request_id, -1),
            Err(LedgerError::Validation(_))
        ));

        let completed = workflow.complete_donation(&donation.request_id, 250).unwrap();
        assert_eq!(completed.status, RequestStatus::Completed);
        assert_eq!(completed.collected_volume, Some(250));

        let unit_id = completed.unit_id.clone().unwrap();
        let unit = workflow.ledger().get_unit(&unit_id).unwrap();
        assert_eq!(unit.volume, 250);
        assert_eq!(unit.status, UnitStatus::Available);
        assert_eq!(unit.blood_type_id, 2);
        assert_eq!(unit.component_id, 3);

        let donor = db.get_member(&donor.member_id).unwrap().unwrap();
        assert_eq!(donor.last_donation_at.as_deref(), Some(unit.add_date.as_str()));
        assert_eq!(workflow.get_donation_request(&donation.request_id).unwrap(), completed);
    }

    #[test]
    fn test_donation_transitions() {
        let (db, donor) = setup();
        let workflow = RequestWorkflow::new(&db);
        let donation = workflow.create_donation_request(&donor.member_id, "Platelets").unwrap();

        let rejected = workflow.reject_donation_request(&donation.request_id).unwrap();
        assert!(rejected.rejected_at.is_some());
        assert!(matches!(
            workflow.approve_donation_request(&donation.request_id),
            Err(LedgerError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            workflow.cancel_donation_request("missing"),
            Err(LedgerError::NotFound(_))
        ));
        assert!(db.list_units_for_donor(&donor.member_id).unwrap().is_empty());
    }
}
