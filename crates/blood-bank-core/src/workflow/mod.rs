//! Transfusion and donation request lifecycles.
//!
//! ```text
//! Pending ──approve──▶ Approved ──complete──▶ Completed
//!    │                    │
//!    ├──reject──▶ Rejected  └──cancel──▶ Cancelled
//!    └──cancel──▶ Cancelled
//! ```

mod donation;
mod transfusion;

use crate::db::Database;
use crate::inventory::{InventoryLedger, LedgerError, LedgerResult};
use crate::models::RequestStatus;

/// Request lifecycle operations. Unit bookkeeping is delegated to the ledger.
pub struct RequestWorkflow<'a> {
    db: &'a Database,
    ledger: InventoryLedger<'a>,
}

impl<'a> RequestWorkflow<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            ledger: InventoryLedger::new(db),
        }
    }

    /// Use a specifically configured ledger (e.g. expiry enforcement off).
    pub fn with_ledger(db: &'a Database, ledger: InventoryLedger<'a>) -> Self {
        Self { db, ledger }
    }

    pub fn ledger(&self) -> &InventoryLedger<'a> {
        &self.ledger
    }
}

fn illegal_transition(from: RequestStatus, to: RequestStatus) -> LedgerError {
    LedgerError::InvalidStateTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

fn positive_volume(volume: i64, what: &str) -> LedgerResult<()> {
    if volume <= 0 {
        return Err(LedgerError::Validation(format!(
            "{} must be positive, got {}",
            what, volume
        )));
    }
    Ok(())
}
