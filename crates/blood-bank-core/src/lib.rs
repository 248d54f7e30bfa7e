//! Blood-Bank Core Library
//!
//! Blood compatibility resolution and blood-unit inventory bookkeeping for a
//! hospital blood bank.
//!
//! # Architecture
//!
//! ```text
//!   "o neg" / "PRBC"
//!          │
//!   ReferenceNormalizer ──▶ canonical names ("O-", "Red Blood Cells")
//!          │
//!   CompatibilityResolver ── rule table (scoped rule > general rule)
//!          │
//!   compatible donor types
//!          │
//!   InventoryLedger ──────── available units, assignment, status changes
//!          │                          │
//!   availability report        TraceLog (hash-chained unit events)
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (BloodUnit, TransfusionRequest, Member, etc.)
//! - [`compatibility`]: Normalizer, resolver and the standard ABO/Rh matrix
//! - [`inventory`]: Inventory ledger
//! - [`workflow`]: Transfusion and donation request lifecycles
//! - [`trace`]: Tamper-evident unit event log
//! - [`config`], [`telemetry`]: Runtime configuration and logging

pub mod compatibility;
pub mod config;
pub mod db;
pub mod inventory;
pub mod models;
pub mod telemetry;
pub mod trace;
pub mod workflow;

// Re-export commonly used types
pub use compatibility::{
    seed_standard_reference_data, CompatibilityError, CompatibilityReport, CompatibilityResolver,
    ReferenceNormalizer,
};
pub use crate::config::BloodBankConfig;
pub use db::Database;
pub use inventory::{InventoryLedger, LedgerError};
pub use models::{
    AllocationProgress, AvailabilitySummary, BloodComponent, BloodType, BloodUnit,
    CompatibilityRule, DonationRequest, Member, RequestStatus, TransfusionRequest,
    TransfusionRequestBloodUnit, UnitStatus, UnitUpdate,
};
pub use trace::TraceLog;
pub use workflow::RequestWorkflow;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use compatibility::SeedSummary;
use models::{ChainVerification, UnitEvent};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum BloodBankError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BloodBankError {
    /// HTTP status a collaborating web layer responds with.
    pub fn http_status(&self) -> u16 {
        match self {
            BloodBankError::Validation(_) => 422,
            BloodBankError::NotFound(_) => 404,
            BloodBankError::InvalidStateTransition { .. } | BloodBankError::Conflict(_) => 409,
            BloodBankError::DatabaseError(_) | BloodBankError::ConfigError(_) => 500,
        }
    }
}

impl From<db::DbError> for BloodBankError {
    fn from(e: db::DbError) -> Self {
        BloodBankError::DatabaseError(e.to_string())
    }
}

impl From<CompatibilityError> for BloodBankError {
    fn from(e: CompatibilityError) -> Self {
        LedgerError::from(e).into()
    }
}

impl From<LedgerError> for BloodBankError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Database(e) => e.into(),
            LedgerError::Validation(msg) => BloodBankError::Validation(msg),
            LedgerError::NotFound(msg) => BloodBankError::NotFound(msg),
            LedgerError::InvalidStateTransition { from, to } => {
                BloodBankError::InvalidStateTransition { from, to }
            }
            LedgerError::Conflict(msg) => BloodBankError::Conflict(msg),
        }
    }
}

impl From<crate::config::ConfigError> for BloodBankError {
    fn from(e: crate::config::ConfigError) -> Self {
        BloodBankError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for BloodBankError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        BloodBankError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path with standard reference data.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<BloodBankCore>, BloodBankError> {
    let mut config = BloodBankConfig::default();
    config.database.path = Some(path);
    BloodBankCore::open_with(&config)
}

/// Create an in-memory database with standard reference data (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<BloodBankCore>, BloodBankError> {
    BloodBankCore::open_with(&BloodBankConfig::default())
}

/// Open from configuration: an explicit file, or `config/blood-bank.toml` and
/// the environment. Also installs the log subscriber.
#[uniffi::export]
pub fn open_database_with_config(
    config_path: Option<String>,
) -> Result<Arc<BloodBankCore>, BloodBankError> {
    let config = match config_path {
        Some(path) => BloodBankConfig::load_from(path)?,
        None => BloodBankConfig::load()?,
    };
    telemetry::init_logging(&config.logging.level);
    BloodBankCore::open_with(&config)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct BloodBankCore {
    db: Arc<Mutex<Database>>,
    enforce_expiry: bool,
}

impl BloodBankCore {
    /// Open the configured database and prepare reference data.
    pub fn open_with(config: &BloodBankConfig) -> Result<Arc<Self>, BloodBankError> {
        let db = match &config.database.path {
            Some(path) => Database::open(path)?,
            None => Database::open_in_memory()?,
        };
        if config.seed_reference_data {
            seed_standard_reference_data(&db)?;
        }
        tracing::info!(
            path = config.database.path.as_deref().unwrap_or(":memory:"),
            enforce_expiry = config.inventory.enforce_expiry,
            "opened blood bank database"
        );
        Ok(Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            enforce_expiry: config.inventory.enforce_expiry,
        }))
    }

    fn ledger<'a>(&self, db: &'a Database) -> InventoryLedger<'a> {
        InventoryLedger::new(db).with_enforce_expiry(self.enforce_expiry)
    }

    fn workflow<'a>(&self, db: &'a Database) -> RequestWorkflow<'a> {
        RequestWorkflow::with_ledger(db, self.ledger(db))
    }
}

fn parse_unit_status(status: &str) -> Result<UnitStatus, BloodBankError> {
    UnitStatus::parse(status)
        .ok_or_else(|| BloodBankError::Validation(format!("unknown unit status {}", status)))
}

fn parse_request_status(status: &str) -> Result<RequestStatus, BloodBankError> {
    RequestStatus::parse(status)
        .ok_or_else(|| BloodBankError::Validation(format!("unknown request status {}", status)))
}

#[uniffi::export]
impl BloodBankCore {
    // =========================================================================
    // Reference Data
    // =========================================================================

    pub fn list_blood_types(&self) -> Result<Vec<FfiBloodType>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db.list_blood_types()?.into_iter().map(Into::into).collect())
    }

    pub fn list_components(&self) -> Result<Vec<FfiBloodComponent>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db.list_components()?.into_iter().map(Into::into).collect())
    }

    /// Install the standard types, components and rules; existing rows are kept.
    pub fn seed_reference_data(&self) -> Result<FfiSeedSummary, BloodBankError> {
        let db = self.db.lock()?;
        let summary = seed_standard_reference_data(&db)?;
        Ok(summary.into())
    }

    /// Set the rule for a donor/recipient pair, optionally scoped to a component.
    pub fn set_compatibility_rule(
        &self,
        donor: String,
        recipient: String,
        component: Option<String>,
        is_compatible: bool,
    ) -> Result<FfiCompatibilityRule, BloodBankError> {
        let db = self.db.lock()?;
        let resolver = CompatibilityResolver::new(&db);
        let donor = resolver
            .lookup_blood_type(&donor)
            .map_err(inventory::invalid_reference)?;
        let recipient = resolver
            .lookup_blood_type(&recipient)
            .map_err(inventory::invalid_reference)?;
        let component = component
            .map(|c| resolver.lookup_component(&c))
            .transpose()
            .map_err(inventory::invalid_reference)?;

        let rule = db.upsert_rule(donor.id, recipient.id, component.map(|c| c.id), is_compatible)?;
        tracing::info!(rule_id = rule.id, is_compatible, "set compatibility rule");
        Ok(rule.into())
    }

    pub fn list_compatibility_rules(&self) -> Result<Vec<FfiCompatibilityRule>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db.list_rules()?.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Member Operations
    // =========================================================================

    /// Register a donor or recipient.
    pub fn create_member(
        &self,
        full_name: String,
        blood_type: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    ) -> Result<FfiMember, BloodBankError> {
        if full_name.trim().is_empty() {
            return Err(BloodBankError::Validation("full name is empty".into()));
        }
        let db = self.db.lock()?;
        let blood_type_id = match blood_type {
            Some(name) => Some(
                CompatibilityResolver::new(&db)
                    .lookup_blood_type(&name)
                    .map_err(inventory::invalid_reference)?
                    .id,
            ),
            None => None,
        };

        let mut member = Member::new(full_name, blood_type_id);
        member.email = email;
        member.phone = phone;
        db.insert_member(&member)?;
        Ok(member.into())
    }

    pub fn get_member(&self, member_id: String) -> Result<Option<FfiMember>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db.get_member(&member_id)?.map(Into::into))
    }

    /// Search members by name prefix.
    pub fn search_members(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiMember>, BloodBankError> {
        let db = self.db.lock()?;
        let members = db.search_members(&query, limit as usize)?;
        Ok(members.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Compatibility Resolver
    // =========================================================================

    /// Donor blood type names compatible with the recipient, in id order.
    pub fn resolve_compatible_donor_types(
        &self,
        recipient: String,
        component: Option<String>,
    ) -> Result<Vec<String>, BloodBankError> {
        let db = self.db.lock()?;
        let donors = CompatibilityResolver::new(&db)
            .resolve_compatible_donor_types(&recipient, component.as_deref())?;
        Ok(donors.into_iter().map(|d| d.name).collect())
    }

    /// `{ "compatibleBloodTypes": [...] }` as JSON.
    pub fn compatibility_report_json(
        &self,
        recipient: String,
        component: Option<String>,
    ) -> Result<String, BloodBankError> {
        let db = self.db.lock()?;
        let report = CompatibilityResolver::new(&db)
            .compatibility_report(&recipient, component.as_deref())?;
        serde_json::to_string(&report).map_err(|e| db::DbError::from(e).into())
    }

    pub fn is_compatible(
        &self,
        donor: String,
        recipient: String,
        component: Option<String>,
    ) -> Result<bool, BloodBankError> {
        let db = self.db.lock()?;
        Ok(CompatibilityResolver::new(&db).is_compatible(
            &donor,
            &recipient,
            component.as_deref(),
        )?)
    }

    /// Available stock per compatible donor type.
    pub fn available_compatible_inventory(
        &self,
        recipient: String,
        component: Option<String>,
    ) -> Result<Vec<FfiAvailabilitySummary>, BloodBankError> {
        let db = self.db.lock()?;
        let inventory = self
            .ledger(&db)
            .available_compatible_inventory(&recipient, component.as_deref())?;
        Ok(inventory.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Inventory Ledger
    // =========================================================================

    pub fn list_available_units(
        &self,
        blood_type: String,
        component: Option<String>,
    ) -> Result<Vec<FfiBloodUnit>, BloodBankError> {
        let db = self.db.lock()?;
        let units = self
            .ledger(&db)
            .list_available_units(&blood_type, component.as_deref())?;
        Ok(units.into_iter().map(Into::into).collect())
    }

    pub fn available_summary(
        &self,
        blood_type: String,
        component: Option<String>,
    ) -> Result<FfiAvailabilitySummary, BloodBankError> {
        let db = self.db.lock()?;
        let summary = self
            .ledger(&db)
            .available_summary(&blood_type, component.as_deref())?;
        Ok(summary.into())
    }

    pub fn create_unit(
        &self,
        blood_type: String,
        component: String,
        donor_member_id: String,
        volume: i64,
    ) -> Result<FfiBloodUnit, BloodBankError> {
        let db = self.db.lock()?;
        let unit = self
            .ledger(&db)
            .create_unit(&blood_type, &component, &donor_member_id, volume)?;
        Ok(unit.into())
    }

    pub fn update_unit(
        &self,
        unit_id: String,
        update: FfiUnitUpdate,
    ) -> Result<FfiBloodUnit, BloodBankError> {
        let update = UnitUpdate {
            status: update.status.as_deref().map(parse_unit_status).transpose()?,
            remaining_volume: update.remaining_volume,
            component: update.component,
        };
        let db = self.db.lock()?;
        let unit = self.ledger(&db).update_unit(&unit_id, update)?;
        Ok(unit.into())
    }

    pub fn assign_to_request(
        &self,
        request_id: String,
        unit_id: String,
        assigned_volume: i64,
    ) -> Result<FfiAssignment, BloodBankError> {
        let db = self.db.lock()?;
        let assignment = self
            .ledger(&db)
            .assign_to_request(&request_id, &unit_id, assigned_volume)?;
        Ok(assignment.into())
    }

    /// Move a unit to `used` or `removed`.
    pub fn transition_unit_status(
        &self,
        unit_id: String,
        status: String,
    ) -> Result<FfiBloodUnit, BloodBankError> {
        let next = parse_unit_status(&status)?;
        let db = self.db.lock()?;
        let unit = self.ledger(&db).transition_status(&unit_id, next)?;
        Ok(unit.into())
    }

    pub fn get_unit(&self, unit_id: String) -> Result<Option<FfiBloodUnit>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db.get_unit(&unit_id)?.map(Into::into))
    }

    pub fn list_units_for_request(
        &self,
        request_id: String,
    ) -> Result<Vec<FfiAssignment>, BloodBankError> {
        let db = self.db.lock()?;
        let rows = self.ledger(&db).list_units_for_request(&request_id)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every unit collected from a donor, newest first.
    pub fn list_units_for_donor(
        &self,
        donor_member_id: String,
    ) -> Result<Vec<FfiBloodUnit>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db
            .list_units_for_donor(&donor_member_id)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Available units whose expiry has passed, for disposal.
    pub fn list_expired_units(&self) -> Result<Vec<FfiBloodUnit>, BloodBankError> {
        let db = self.db.lock()?;
        let units = self.ledger(&db).list_expired_units_at(chrono::Utc::now())?;
        Ok(units.into_iter().map(Into::into).collect())
    }

    // =========================================================================
    // Transfusion Requests
    // =========================================================================

    pub fn create_transfusion_request(
        &self,
        recipient_member_id: String,
        blood_type: String,
        component: String,
        requested_volume: i64,
        notes: Option<String>,
    ) -> Result<FfiTransfusionRequest, BloodBankError> {
        let db = self.db.lock()?;
        let request = self.workflow(&db).create_transfusion_request(
            &recipient_member_id,
            &blood_type,
            &component,
            requested_volume,
            notes,
        )?;
        Ok(request.into())
    }

    pub fn get_transfusion_request(
        &self,
        request_id: String,
    ) -> Result<Option<FfiTransfusionRequest>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db.get_transfusion_request(&request_id)?.map(Into::into))
    }

    /// Requests in one status (e.g. `pending`), oldest first.
    pub fn list_transfusion_requests(
        &self,
        status: String,
    ) -> Result<Vec<FfiTransfusionRequest>, BloodBankError> {
        let status = parse_request_status(&status)?;
        let db = self.db.lock()?;
        Ok(db
            .list_transfusion_requests_by_status(status)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub fn approve_transfusion_request(
        &self,
        request_id: String,
    ) -> Result<FfiTransfusionRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self.workflow(&db).approve_transfusion_request(&request_id)?.into())
    }

    pub fn reject_transfusion_request(
        &self,
        request_id: String,
    ) -> Result<FfiTransfusionRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self.workflow(&db).reject_transfusion_request(&request_id)?.into())
    }

    pub fn cancel_transfusion_request(
        &self,
        request_id: String,
    ) -> Result<FfiTransfusionRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self.workflow(&db).cancel_transfusion_request(&request_id)?.into())
    }

    pub fn complete_transfusion_request(
        &self,
        request_id: String,
    ) -> Result<FfiTransfusionRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self.workflow(&db).complete_transfusion_request(&request_id)?.into())
    }

    pub fn allocation_progress(
        &self,
        request_id: String,
    ) -> Result<FfiAllocationProgress, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self.workflow(&db).allocation_progress(&request_id)?.into())
    }

    // =========================================================================
    // Donation Requests
    // =========================================================================

    pub fn create_donation_request(
        &self,
        donor_member_id: String,
        component: String,
    ) -> Result<FfiDonationRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self
            .workflow(&db)
            .create_donation_request(&donor_member_id, &component)?
            .into())
    }

    pub fn get_donation_request(
        &self,
        request_id: String,
    ) -> Result<Option<FfiDonationRequest>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db.get_donation_request(&request_id)?.map(Into::into))
    }

    pub fn list_donation_requests_for_donor(
        &self,
        donor_member_id: String,
    ) -> Result<Vec<FfiDonationRequest>, BloodBankError> {
        let db = self.db.lock()?;
        Ok(db
            .list_donation_requests_for_donor(&donor_member_id)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub fn approve_donation_request(
        &self,
        request_id: String,
    ) -> Result<FfiDonationRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self.workflow(&db).approve_donation_request(&request_id)?.into())
    }

    pub fn reject_donation_request(
        &self,
        request_id: String,
    ) -> Result<FfiDonationRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self.workflow(&db).reject_donation_request(&request_id)?.into())
    }

    pub fn cancel_donation_request(
        &self,
        request_id: String,
    ) -> Result<FfiDonationRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self.workflow(&db).cancel_donation_request(&request_id)?.into())
    }

    /// Record collection; returns the request with the new unit's id.
    pub fn complete_donation(
        &self,
        request_id: String,
        collected_volume: i64,
    ) -> Result<FfiDonationRequest, BloodBankError> {
        let db = self.db.lock()?;
        Ok(self
            .workflow(&db)
            .complete_donation(&request_id, collected_volume)?
            .into())
    }

    // =========================================================================
    // Traceability
    // =========================================================================

    pub fn unit_history(&self, unit_id: String) -> Result<Vec<FfiUnitEvent>, BloodBankError> {
        let db = self.db.lock()?;
        let events = self.ledger(&db).unit_history(&unit_id)?;
        Ok(events.into_iter().map(Into::into).collect())
    }

    /// Recompute the whole unit event chain.
    pub fn verify_trace_chain(&self) -> Result<FfiChainVerification, BloodBankError> {
        let db = self.db.lock()?;
        Ok(TraceLog::new(&db).verify_chain()?.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBloodType {
    pub id: i64,
    pub name: String,
}

impl From<BloodType> for FfiBloodType {
    fn from(blood_type: BloodType) -> Self {
        Self {
            id: blood_type.id,
            name: blood_type.name,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBloodComponent {
    pub id: i64,
    pub name: String,
    pub shelf_life_days: i64,
}

impl From<BloodComponent> for FfiBloodComponent {
    fn from(component: BloodComponent) -> Self {
        Self {
            id: component.id,
            name: component.name,
            shelf_life_days: component.shelf_life_days,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCompatibilityRule {
    pub id: i64,
    pub donor_blood_type_id: i64,
    pub recipient_blood_type_id: i64,
    pub component_id: Option<i64>,
    pub is_compatible: bool,
}

impl From<CompatibilityRule> for FfiCompatibilityRule {
    fn from(rule: CompatibilityRule) -> Self {
        Self {
            id: rule.id,
            donor_blood_type_id: rule.donor_blood_type_id,
            recipient_blood_type_id: rule.recipient_blood_type_id,
            component_id: rule.component_id,
            is_compatible: rule.is_compatible,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSeedSummary {
    pub blood_types: u32,
    pub components: u32,
    pub rules_inserted: u32,
}

impl From<SeedSummary> for FfiSeedSummary {
    fn from(summary: SeedSummary) -> Self {
        Self {
            blood_types: summary.blood_types,
            components: summary.components,
            rules_inserted: summary.rules_inserted,
        }
    }
}

/// FFI-safe member.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMember {
    pub member_id: String,
    pub full_name: String,
    pub blood_type_id: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub last_donation_at: Option<String>,
}

impl From<Member> for FfiMember {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.member_id,
            full_name: member.full_name,
            blood_type_id: member.blood_type_id,
            email: member.email,
            phone: member.phone,
            last_donation_at: member.last_donation_at,
        }
    }
}

/// FFI-safe blood unit. Status is the stored snake_case name.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBloodUnit {
    pub unit_id: String,
    pub blood_type_id: i64,
    pub component_id: i64,
    pub donor_member_id: String,
    pub volume: i64,
    pub remaining_volume: i64,
    pub status: String,
    pub add_date: String,
    pub expiry_date: String,
}

impl From<BloodUnit> for FfiBloodUnit {
    fn from(unit: BloodUnit) -> Self {
        Self {
            unit_id: unit.unit_id,
            blood_type_id: unit.blood_type_id,
            component_id: unit.component_id,
            donor_member_id: unit.donor_member_id,
            volume: unit.volume,
            remaining_volume: unit.remaining_volume,
            status: unit.status.as_str().to_string(),
            add_date: unit.add_date,
            expiry_date: unit.expiry_date,
        }
    }
}

/// Partial unit update; `None` fields are left unchanged.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUnitUpdate {
    pub status: Option<String>,
    pub remaining_volume: Option<i64>,
    pub component: Option<String>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAvailabilitySummary {
    pub blood_type: String,
    pub units: u32,
    pub total_volume: i64,
}

impl From<AvailabilitySummary> for FfiAvailabilitySummary {
    fn from(summary: AvailabilitySummary) -> Self {
        Self {
            blood_type: summary.blood_type,
            units: summary.units,
            total_volume: summary.total_volume,
        }
    }
}

/// FFI-safe unit-to-request assignment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssignment {
    pub request_id: String,
    pub unit_id: String,
    pub assigned_volume: i64,
    pub status: String,
    pub assigned_at: String,
}

impl From<TransfusionRequestBloodUnit> for FfiAssignment {
    fn from(assignment: TransfusionRequestBloodUnit) -> Self {
        Self {
            request_id: assignment.request_id,
            unit_id: assignment.unit_id,
            assigned_volume: assignment.assigned_volume,
            status: assignment.status.as_str().to_string(),
            assigned_at: assignment.assigned_at,
        }
    }
}

/// FFI-safe transfusion request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTransfusionRequest {
    pub request_id: String,
    pub recipient_member_id: String,
    pub blood_type_id: i64,
    pub component_id: i64,
    pub requested_volume: i64,
    pub status: String,
    pub notes: Option<String>,
    pub requested_at: String,
    pub approved_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub rejected_at: Option<String>,
}

impl From<TransfusionRequest> for FfiTransfusionRequest {
    fn from(request: TransfusionRequest) -> Self {
        Self {
            request_id: request.request_id,
            recipient_member_id: request.recipient_member_id,
            blood_type_id: request.blood_type_id,
            component_id: request.component_id,
            requested_volume: request.requested_volume,
            status: request.status.as_str().to_string(),
            notes: request.notes,
            requested_at: request.requested_at,
            approved_at: request.approved_at,
            completed_at: request.completed_at,
            cancelled_at: request.cancelled_at,
            rejected_at: request.rejected_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAllocationProgress {
    pub requested: i64,
    pub assigned: i64,
    pub outstanding: i64,
    pub fulfilled: bool,
}

impl From<AllocationProgress> for FfiAllocationProgress {
    fn from(progress: AllocationProgress) -> Self {
        Self {
            requested: progress.requested,
            assigned: progress.assigned,
            outstanding: progress.outstanding,
            fulfilled: progress.is_fulfilled(),
        }
    }
}

/// FFI-safe donation request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDonationRequest {
    pub request_id: String,
    pub donor_member_id: String,
    pub blood_type_id: i64,
    pub component_id: i64,
    pub status: String,
    pub collected_volume: Option<i64>,
    pub unit_id: Option<String>,
    pub created_at: String,
    pub approved_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancelled_at: Option<String>,
    pub rejected_at: Option<String>,
}

impl From<DonationRequest> for FfiDonationRequest {
    fn from(donation: DonationRequest) -> Self {
        Self {
            request_id: donation.request_id,
            donor_member_id: donation.donor_member_id,
            blood_type_id: donation.blood_type_id,
            component_id: donation.component_id,
            status: donation.status.as_str().to_string(),
            collected_volume: donation.collected_volume,
            unit_id: donation.unit_id,
            created_at: donation.created_at,
            approved_at: donation.approved_at,
            completed_at: donation.completed_at,
            cancelled_at: donation.cancelled_at,
            rejected_at: donation.rejected_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUnitEvent {
    pub sequence: i64,
    pub unit_id: String,
    pub kind: String,
    pub payload: String,
    pub prev_hash: String,
    pub hash: String,
    pub recorded_at: String,
}

impl From<UnitEvent> for FfiUnitEvent {
    fn from(event: UnitEvent) -> Self {
        Self {
            sequence: event.sequence,
            unit_id: event.unit_id,
            kind: event.kind.as_str().to_string(),
            payload: event.payload,
            prev_hash: event.prev_hash,
            hash: event.hash,
            recorded_at: event.recorded_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChainVerification {
    pub events: u32,
    pub valid: bool,
    pub first_broken_sequence: Option<i64>,
}

impl From<ChainVerification> for FfiChainVerification {
    fn from(verification: ChainVerification) -> Self {
        Self {
            events: verification.events,
            valid: verification.valid,
            first_broken_sequence: verification.first_broken_sequence,
        }
    }
}
