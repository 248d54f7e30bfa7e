//! Blood-unit inventory ledger.
//!
//! Every mutation runs as one unit of work: the checks, the unit write and the
//! trace event commit together or not at all. Unit writes are guarded by the
//! unit's version so a stale read never overwrites a newer one.

mod availability;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use thiserror::Error;

use crate::compatibility::{CompatibilityError, CompatibilityResolver};
use crate::db::{Database, DbError};
use crate::models::{
    format_timestamp, now_timestamp, parse_timestamp, AssignmentStatus, BloodUnit,
    TransfusionRequestBloodUnit, UnitEvent, UnitEventKind, UnitStatus, UnitUpdate,
};
use crate::trace::TraceLog;

/// Ledger and workflow errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<CompatibilityError> for LedgerError {
    fn from(e: CompatibilityError) -> Self {
        match e {
            CompatibilityError::Database(e) => LedgerError::Database(e),
            CompatibilityError::UnknownBloodType(name) => {
                LedgerError::NotFound(format!("blood type {}", name))
            }
            CompatibilityError::UnknownComponent(name) => {
                LedgerError::NotFound(format!("blood component {}", name))
            }
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Unknown reference names supplied as mutation input are invalid input.
pub(crate) fn invalid_reference(e: CompatibilityError) -> LedgerError {
    match e {
        CompatibilityError::Database(e) => LedgerError::Database(e),
        CompatibilityError::UnknownBloodType(name) => {
            LedgerError::Validation(format!("unknown blood type {}", name))
        }
        CompatibilityError::UnknownComponent(name) => {
            LedgerError::Validation(format!("unknown blood component {}", name))
        }
    }
}

pub(crate) fn log_rejection(operation: &'static str, subject: &str, error: &LedgerError) {
    match error {
        LedgerError::Database(e) => {
            tracing::error!(operation, subject = %subject, error = %e, "operation failed")
        }
        _ => tracing::warn!(operation, subject = %subject, error = %error, "mutation rejected"),
    }
}

/// Tracks blood units and their allocation to transfusion requests.
pub struct InventoryLedger<'a> {
    db: &'a Database,
    resolver: CompatibilityResolver<'a>,
    enforce_expiry: bool,
}

impl<'a> InventoryLedger<'a> {
    /// Create a ledger that refuses expired units.
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            resolver: CompatibilityResolver::new(db),
            enforce_expiry: true,
        }
    }

    pub fn with_enforce_expiry(mut self, enforce_expiry: bool) -> Self {
        self.enforce_expiry = enforce_expiry;
        self
    }

    pub fn resolver(&self) -> &CompatibilityResolver<'a> {
        &self.resolver
    }

    /// Expiry filter for availability queries at `now`.
    fn expiry_cutoff(&self, now: DateTime<Utc>) -> Option<String> {
        self.enforce_expiry.then(|| format_timestamp(now))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_unit(&self, unit_id: &str) -> LedgerResult<BloodUnit> {
        load_unit(self.db, unit_id)
    }

    /// Assignments of a transfusion request.
    pub fn list_units_for_request(
        &self,
        request_id: &str,
    ) -> LedgerResult<Vec<TransfusionRequestBloodUnit>> {
        if self.db.get_transfusion_request(request_id)?.is_none() {
            return Err(LedgerError::NotFound(format!(
                "transfusion request {}",
                request_id
            )));
        }
        Ok(self.db.list_assignments_for_request(request_id)?)
    }

    /// Available units whose expiry has been reached at `at`.
    pub fn list_expired_units_at(&self, at: DateTime<Utc>) -> LedgerResult<Vec<BloodUnit>> {
        Ok(self.db.list_expired_available_units(&format_timestamp(at))?)
    }

    /// A unit's trace events in append order.
    pub fn unit_history(&self, unit_id: &str) -> LedgerResult<Vec<UnitEvent>> {
        load_unit(self.db, unit_id)?;
        Ok(TraceLog::new(self.db).history(unit_id)?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Register a freshly collected unit.
    pub fn create_unit(
        &self,
        blood_type: &str,
        component: &str,
        donor_member_id: &str,
        volume: i64,
    ) -> LedgerResult<BloodUnit> {
        self.create_unit_at(blood_type, component, donor_member_id, volume, Utc::now())
    }

    /// [`Self::create_unit`] with an explicit collection instant.
    pub fn create_unit_at(
        &self,
        blood_type: &str,
        component: &str,
        donor_member_id: &str,
        volume: i64,
        added_at: DateTime<Utc>,
    ) -> LedgerResult<BloodUnit> {
        self.db
            .atomically(|db| {
                if volume <= 0 {
                    return Err(LedgerError::Validation(format!(
                        "volume must be positive, got {}",
                        volume
                    )));
                }
                let blood_type = self
                    .resolver
                    .lookup_blood_type(blood_type)
                    .map_err(invalid_reference)?;
                let component = self
                    .resolver
                    .lookup_component(component)
                    .map_err(invalid_reference)?;
                let donor = db.get_member(donor_member_id)?.ok_or_else(|| {
                    LedgerError::Validation(format!("unknown donor member {}", donor_member_id))
                })?;

                let unit = BloodUnit::new(
                    blood_type.id,
                    component.id,
                    donor.member_id,
                    volume,
                    component.shelf_life_days,
                    added_at,
                );
                db.insert_unit(&unit)?;
                TraceLog::new(db).record(
                    &unit.unit_id,
                    UnitEventKind::Created,
                    &json!({
                        "bloodType": blood_type.name,
                        "component": component.name,
                        "donorMemberId": unit.donor_member_id,
                        "volume": unit.volume,
                        "addDate": unit.add_date,
                        "expiryDate": unit.expiry_date,
                    }),
                )?;
                Ok(unit)
            })
            .inspect(|unit| {
                tracing::info!(
                    unit_id = %unit.unit_id,
                    blood_type_id = unit.blood_type_id,
                    component_id = unit.component_id,
                    volume = unit.volume,
                    "created blood unit"
                )
            })
            .inspect_err(|e| log_rejection("create_unit", donor_member_id, e))
    }

    /// Apply a partial update to a unit.
    ///
    /// Status changes follow [`UnitStatus::can_transition_to`]. Reclassifying
    /// the component recomputes expiry from the add date. A remaining volume of
    /// zero on an available unit marks it used.
    pub fn update_unit(&self, unit_id: &str, update: UnitUpdate) -> LedgerResult<BloodUnit> {
        self.db
            .atomically(|db| {
                let mut unit = load_unit(db, unit_id)?;
                if update.is_empty() {
                    return Ok(unit);
                }

                if let Some(name) = &update.component {
                    let component = self
                        .resolver
                        .lookup_component(name)
                        .map_err(invalid_reference)?;
                    if component.id != unit.component_id {
                        let added = parse_timestamp(&unit.add_date).ok_or_else(|| {
                            DbError::Constraint(format!(
                                "Unparseable add_date on unit {}: {}",
                                unit.unit_id, unit.add_date
                            ))
                        })?;
                        unit.component_id = component.id;
                        unit.expiry_date =
                            format_timestamp(added + Duration::days(component.shelf_life_days));
                    }
                }

                if let Some(remaining) = update.remaining_volume {
                    if !(0..=unit.volume).contains(&remaining) {
                        return Err(LedgerError::Validation(format!(
                            "remaining volume {} outside 0..={}",
                            remaining, unit.volume
                        )));
                    }
                    unit.remaining_volume = remaining;
                }

                if let Some(next) = update.status {
                    if next != unit.status {
                        apply_status(&mut unit, next)?;
                    }
                }

                match unit.status {
                    UnitStatus::Removed if unit.remaining_volume > 0 => {
                        return Err(LedgerError::Validation(format!(
                            "removed unit {} cannot hold volume",
                            unit.unit_id
                        )));
                    }
                    UnitStatus::Available if unit.remaining_volume == 0 => {
                        unit.status = UnitStatus::Used;
                    }
                    _ => {}
                }

                unit.updated_at = now_timestamp();
                persist_unit(db, &mut unit)?;
                TraceLog::new(db).record(
                    &unit.unit_id,
                    UnitEventKind::Updated,
                    &json!({
                        "componentId": unit.component_id,
                        "remainingVolume": unit.remaining_volume,
                        "status": unit.status.as_str(),
                        "expiryDate": unit.expiry_date,
                    }),
                )?;
                Ok(unit)
            })
            .inspect(|unit| {
                tracing::info!(
                    unit_id = %unit.unit_id,
                    status = unit.status.as_str(),
                    remaining_volume = unit.remaining_volume,
                    "updated blood unit"
                )
            })
            .inspect_err(|e| log_rejection("update_unit", unit_id, e))
    }

    /// Allocate `assigned_volume` mL of a unit to a transfusion request.
    pub fn assign_to_request(
        &self,
        request_id: &str,
        unit_id: &str,
        assigned_volume: i64,
    ) -> LedgerResult<TransfusionRequestBloodUnit> {
        self.assign_to_request_at(request_id, unit_id, assigned_volume, Utc::now())
    }

    /// [`Self::assign_to_request`] evaluated at an explicit instant.
    pub fn assign_to_request_at(
        &self,
        request_id: &str,
        unit_id: &str,
        assigned_volume: i64,
        now: DateTime<Utc>,
    ) -> LedgerResult<TransfusionRequestBloodUnit> {
        self.db
            .atomically(|db| {
                if assigned_volume <= 0 {
                    return Err(LedgerError::Validation(format!(
                        "assigned volume must be positive, got {}",
                        assigned_volume
                    )));
                }
                let request = db.get_transfusion_request(request_id)?.ok_or_else(|| {
                    LedgerError::NotFound(format!("transfusion request {}", request_id))
                })?;
                let mut unit = load_unit(db, unit_id)?;

                if db.get_assignment(request_id, unit_id)?.is_some() {
                    return Err(duplicate_assignment(request_id, unit_id));
                }
                if !request.status.is_open() {
                    return Err(LedgerError::Validation(format!(
                        "request {} is {}",
                        request_id,
                        request.status.as_str()
                    )));
                }
                if !unit.is_assignable_at(now, self.enforce_expiry) {
                    return Err(unassignable(&unit));
                }
                if unit.component_id != request.component_id {
                    return Err(LedgerError::Validation(format!(
                        "unit {} is a different component than request {}",
                        unit_id, request_id
                    )));
                }
                if assigned_volume > unit.remaining_volume {
                    return Err(LedgerError::Validation(format!(
                        "assigned volume {} exceeds remaining volume {}",
                        assigned_volume, unit.remaining_volume
                    )));
                }
                if !self.resolver.is_compatible_by_id(
                    unit.blood_type_id,
                    request.blood_type_id,
                    Some(request.component_id),
                )? {
                    return Err(LedgerError::Validation(format!(
                        "unit {} blood type is not compatible with request {}",
                        unit_id, request_id
                    )));
                }

                let assignment = TransfusionRequestBloodUnit {
                    request_id: request.request_id,
                    unit_id: unit.unit_id.clone(),
                    assigned_volume,
                    status: AssignmentStatus::Assigned,
                    assigned_at: format_timestamp(now),
                };
                db.insert_assignment(&assignment).map_err(|e| {
                    if e.is_unique_violation() {
                        duplicate_assignment(request_id, unit_id)
                    } else {
                        e.into()
                    }
                })?;

                unit.remaining_volume -= assigned_volume;
                if unit.remaining_volume == 0 {
                    unit.status = UnitStatus::Used;
                }
                unit.updated_at = format_timestamp(now);
                persist_unit(db, &mut unit)?;

                TraceLog::new(db).record(
                    &unit.unit_id,
                    UnitEventKind::Assigned,
                    &json!({
                        "requestId": assignment.request_id,
                        "assignedVolume": assigned_volume,
                        "remainingVolume": unit.remaining_volume,
                        "status": unit.status.as_str(),
                    }),
                )?;
                Ok(assignment)
            })
            .inspect(|assignment| {
                tracing::info!(
                    request_id = %assignment.request_id,
                    unit_id = %assignment.unit_id,
                    assigned_volume = assignment.assigned_volume,
                    "assigned unit to request"
                )
            })
            .inspect_err(|e| log_rejection("assign_to_request", unit_id, e))
    }

    /// Move a unit through its lifecycle. Removal forces remaining volume to 0.
    pub fn transition_status(&self, unit_id: &str, next: UnitStatus) -> LedgerResult<BloodUnit> {
        self.db
            .atomically(|db| {
                let mut unit = load_unit(db, unit_id)?;
                let previous = unit.status;
                apply_status(&mut unit, next)?;
                unit.updated_at = now_timestamp();
                persist_unit(db, &mut unit)?;

                TraceLog::new(db).record(
                    &unit.unit_id,
                    UnitEventKind::StatusChanged,
                    &json!({
                        "from": previous.as_str(),
                        "to": next.as_str(),
                        "remainingVolume": unit.remaining_volume,
                    }),
                )?;
                Ok(unit)
            })
            .inspect(|unit| {
                tracing::info!(unit_id = %unit.unit_id, status = unit.status.as_str(), "unit status changed")
            })
            .inspect_err(|e| log_rejection("transition_status", unit_id, e))
    }
}

fn load_unit(db: &Database, unit_id: &str) -> LedgerResult<BloodUnit> {
    db.get_unit(unit_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("blood unit {}", unit_id)))
}

fn duplicate_assignment(request_id: &str, unit_id: &str) -> LedgerError {
    LedgerError::Conflict(format!(
        "unit {} is already assigned to request {}",
        unit_id, request_id
    ))
}

/// Why [`BloodUnit::is_assignable_at`] refused the unit.
fn unassignable(unit: &BloodUnit) -> LedgerError {
    let reason = match unit.status {
        UnitStatus::Available if unit.remaining_volume == 0 => "has no remaining volume".to_string(),
        UnitStatus::Available => format!("expired at {}", unit.expiry_date),
        status => format!("is {}", status.as_str()),
    };
    LedgerError::Validation(format!("unit {} {}", unit.unit_id, reason))
}

fn apply_status(unit: &mut BloodUnit, next: UnitStatus) -> LedgerResult<()> {
    if !unit.status.can_transition_to(next) {
        return Err(LedgerError::InvalidStateTransition {
            from: unit.status.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }
    unit.status = next;
    if next.is_terminal() {
        unit.remaining_volume = 0;
    }
    Ok(())
}

/// Versioned write; the in-memory copy tracks the stored version on success.
fn persist_unit(db: &Database, unit: &mut BloodUnit) -> LedgerResult<()> {
    if !db.update_unit_versioned(unit)? {
        return Err(LedgerError::Conflict(format!(
            "unit {} was modified concurrently",
            unit.unit_id
        )));
    }
    unit.version += 1;
    Ok(())
}
