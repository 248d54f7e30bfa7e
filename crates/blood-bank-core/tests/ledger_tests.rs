//! Inventory ledger and request workflow integration tests.

use blood_bank_core::compatibility::seed_standard_reference_data;
use blood_bank_core::db::Database;
use blood_bank_core::inventory::{InventoryLedger, LedgerError};
use blood_bank_core::models::{Member, TransfusionRequest, UnitStatus};
use blood_bank_core::trace::TraceLog;
use blood_bank_core::workflow::RequestWorkflow;
use blood_bank_core::{open_database, open_database_in_memory, BloodBankError, FfiUnitUpdate};
use proptest::prelude::*;

struct Fixture {
    db: Database,
    donor: Member,
    recipient: Member,
}

impl Fixture {
    fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        seed_standard_reference_data(&db).unwrap();
        let donor = Member::new("Donor".into(), Some(1));
        let recipient = Member::new("Recipient".into(), Some(8));
        db.insert_member(&donor).unwrap();
        db.insert_member(&recipient).unwrap();
        Self { db, donor, recipient }
    }

    fn request(&self, volume: i64) -> TransfusionRequest {
        RequestWorkflow::new(&self.db)
            .create_transfusion_request(&self.recipient.member_id, "AB+", "Whole Blood", volume, None)
            .unwrap()
    }
}

#[test]
fn test_create_unit_rejects_negative_volume() {
    let fx = Fixture::new();
    let ledger = InventoryLedger::new(&fx.db);

    let result = ledger.create_unit("O-", "Whole Blood", &fx.donor.member_id, -5);
    assert!(matches!(result, Err(LedgerError::Validation(_))));

    let unit = ledger.create_unit("O-", "Whole Blood", &fx.donor.member_id, 450).unwrap();
    assert_eq!(unit.remaining_volume, 450);
    assert_eq!(unit.status, UnitStatus::Available);
}

#[test]
fn test_full_assignment_uses_unit() {
    let fx = Fixture::new();
    let ledger = InventoryLedger::new(&fx.db);
    let unit = ledger.create_unit("O-", "Whole Blood", &fx.donor.member_id, 450).unwrap();
    let first = fx.request(450);

    let assignment = ledger.assign_to_request(&first.request_id, &unit.unit_id, 450).unwrap();
    assert_eq!(assignment.assigned_volume, 450);

    let stored = ledger.get_unit(&unit.unit_id).unwrap();
    assert_eq!(stored.remaining_volume, 0);
    assert_eq!(stored.status, UnitStatus::Used);

    let second = fx.request(100);
    assert!(ledger.assign_to_request(&second.request_id, &unit.unit_id, 1).is_err());
    assert!(ledger.list_available_units("O-", None).unwrap().is_empty());
}

#[test]
fn test_duplicate_pair_is_conflict() {
    let fx = Fixture::new();
    let ledger = InventoryLedger::new(&fx.db);
    let unit = ledger.create_unit("A+", "Whole Blood", &fx.donor.member_id, 450).unwrap();
    let request = fx.request(300);

    ledger.assign_to_request(&request.request_id, &unit.unit_id, 100).unwrap();
    assert!(matches!(
        ledger.assign_to_request(&request.request_id, &unit.unit_id, 100),
        Err(LedgerError::Conflict(_))
    ));
}

#[test]
fn test_removal_zeroes_remaining_and_is_terminal() {
    let fx = Fixture::new();
    let ledger = InventoryLedger::new(&fx.db);
    let unit = ledger.create_unit("B-", "Platelets", &fx.donor.member_id, 250).unwrap();

    let removed = ledger.transition_status(&unit.unit_id, UnitStatus::Removed).unwrap();
    assert_eq!(removed.remaining_volume, 0);
    for next in [UnitStatus::Available, UnitStatus::Used, UnitStatus::Removed] {
        assert!(matches!(
            ledger.transition_status(&unit.unit_id, next),
            Err(LedgerError::InvalidStateTransition { .. })
        ));
    }
}

#[test]
fn test_trace_chain_detects_tampering() {
    let fx = Fixture::new();
    let ledger = InventoryLedger::new(&fx.db);
    let unit = ledger.create_unit("O-", "Whole Blood", &fx.donor.member_id, 450).unwrap();
    let request = fx.request(450);
    ledger.assign_to_request(&request.request_id, &unit.unit_id, 200).unwrap();
    ledger.transition_status(&unit.unit_id, UnitStatus::Used).unwrap();

    let log = TraceLog::new(&fx.db);
    assert!(log.verify_chain().unwrap().valid);

    fx.db
        .conn()
        .execute_batch(
            r#"
            DROP TRIGGER unit_events_no_update;
            UPDATE unit_events SET payload = replace(payload, '200', '20') WHERE sequence = 2;
            "#,
        )
        .unwrap();

    let verification = log.verify_chain().unwrap();
    assert!(!verification.valid);
    assert_eq!(verification.first_broken_sequence, Some(2));
}

#[test]
fn test_trace_log_is_append_only() {
    let fx = Fixture::new();
    let ledger = InventoryLedger::new(&fx.db);
    ledger.create_unit("O-", "Whole Blood", &fx.donor.member_id, 450).unwrap();

    assert!(fx.db.conn().execute("DELETE FROM unit_events", []).is_err());
    assert!(fx
        .db
        .conn()
        .execute("UPDATE unit_events SET payload = '{}'", [])
        .is_err());
}

#[test]
fn test_donation_to_transfusion_end_to_end() {
    let fx = Fixture::new();
    let workflow = RequestWorkflow::new(&fx.db);

    let donation = workflow.create_donation_request(&fx.donor.member_id, "Whole Blood").unwrap();
    workflow.approve_donation_request(&donation.request_id).unwrap();
    let donation = workflow.complete_donation(&donation.request_id, 450).unwrap();
    let unit_id = donation.unit_id.unwrap();

    let request = fx.request(450);
    workflow.approve_transfusion_request(&request.request_id).unwrap();
    workflow
        .ledger()
        .assign_to_request(&request.request_id, &unit_id, 450)
        .unwrap();
    assert!(workflow.allocation_progress(&request.request_id).unwrap().is_fulfilled());
    workflow.complete_transfusion_request(&request.request_id).unwrap();

    let history = workflow.ledger().unit_history(&unit_id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(workflow.ledger().get_unit(&unit_id).unwrap().status, UnitStatus::Used);
}

#[test]
fn test_ffi_surface_round_trip() {
    let core = open_database_in_memory().unwrap();
    assert_eq!(core.list_blood_types().unwrap().len(), 8);

    let donor = core
        .create_member("Donor".into(), Some("o neg".into()), None, None)
        .unwrap();
    let recipient = core
        .create_member("Recipient".into(), Some("A+".into()), None, None)
        .unwrap();

    let unit = core
        .create_unit("O-".into(), "PRBC".into(), donor.member_id.clone(), 300)
        .unwrap();
    assert_eq!(unit.status, "available");

    let request = core
        .create_transfusion_request(recipient.member_id, "A+".into(), "rbc".into(), 500, None)
        .unwrap();
    core.assign_to_request(request.request_id.clone(), unit.unit_id.clone(), 300)
        .unwrap();

    let err = core
        .assign_to_request(request.request_id.clone(), unit.unit_id.clone(), 1)
        .unwrap_err();
    assert!(matches!(err, BloodBankError::Conflict(_)));
    assert_eq!(err.http_status(), 409);

    let err = core
        .transition_unit_status(unit.unit_id.clone(), "available".into())
        .unwrap_err();
    assert_eq!(err.http_status(), 409);

    let err = core
        .update_unit(
            unit.unit_id.clone(),
            FfiUnitUpdate { status: Some("reserved".into()), remaining_volume: None, component: None },
        )
        .unwrap_err();
    assert_eq!(err.http_status(), 422);

    let progress = core.allocation_progress(request.request_id).unwrap();
    assert_eq!(progress.outstanding, 200);

    let json = core.compatibility_report_json("A+".into(), None).unwrap();
    assert!(json.contains("\"compatibleBloodTypes\":[\"O-\",\"O+\",\"A-\",\"A+\"]"));

    assert!(core.get_unit("missing".into()).unwrap().is_none());
    assert_eq!(core.resolve_compatible_donor_types("Q+".into(), None).unwrap_err().http_status(), 404);
    assert!(core.verify_trace_chain().unwrap().valid);
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blood-bank.db").to_string_lossy().to_string();

    let unit_id = {
        let core = open_database(path.clone()).unwrap();
        let donor = core.create_member("Donor".into(), Some("B+".into()), None, None).unwrap();
        core.create_unit("B+".into(), "Plasma".into(), donor.member_id, 220)
            .unwrap()
            .unit_id
    };

    let core = open_database(path).unwrap();
    let unit = core.get_unit(unit_id).unwrap().unwrap();
    assert_eq!(unit.remaining_volume, 220);
    assert_eq!(core.seed_reference_data().unwrap().rules_inserted, 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Remaining volume always equals collected volume minus accepted
    /// assignments; rejected assignments change nothing.
    #[test]
    fn prop_assignment_volume_accounting(
        volume in 1i64..=600,
        attempts in prop::collection::vec(-50i64..=700, 1..8),
    ) {
        let fx = Fixture::new();
        let ledger = InventoryLedger::new(&fx.db);
        let unit = ledger.create_unit("O-", "Whole Blood", &fx.donor.member_id, volume).unwrap();

        let mut remaining = volume;
        for attempt in attempts {
            let request = fx.request(attempt.max(1));
            let before = ledger.get_unit(&unit.unit_id).unwrap();
            let result = ledger.assign_to_request(&request.request_id, &unit.unit_id, attempt);

            if attempt > 0 && attempt <= remaining {
                prop_assert!(result.is_ok());
                remaining -= attempt;
            } else {
                prop_assert!(matches!(result, Err(LedgerError::Validation(_))));
                prop_assert_eq!(ledger.get_unit(&unit.unit_id).unwrap(), before);
            }

            let stored = ledger.get_unit(&unit.unit_id).unwrap();
            prop_assert_eq!(stored.remaining_volume, remaining);
            prop_assert_eq!(stored.status == UnitStatus::Used, remaining == 0);
        }
    }
}
