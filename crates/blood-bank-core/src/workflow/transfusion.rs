//! Transfusion request lifecycle.

use super::{illegal_transition, positive_volume, RequestWorkflow};
use crate::inventory::{invalid_reference, log_rejection, LedgerError, LedgerResult};
use crate::models::{
    now_timestamp, AllocationProgress, AssignmentStatus, RequestStatus, TransfusionRequest,
};

impl<'a> RequestWorkflow<'a> {
    /// Open a pending request for a recipient.
    ///
    /// A recipient with a recorded blood type may only request that type.
    pub fn create_transfusion_request(
        &self,
        recipient_member_id: &str,
        blood_type: &str,
        component: &str,
        requested_volume: i64,
        notes: Option<String>,
    ) -> LedgerResult<TransfusionRequest> {
        self.db
            .atomically(|db| {
                positive_volume(requested_volume, "requested volume")?;
                let resolver = self.ledger.resolver();
                let blood_type = resolver
                    .lookup_blood_type(blood_type)
                    .map_err(invalid_reference)?;
                let component = resolver
                    .lookup_component(component)
                    .map_err(invalid_reference)?;
                let recipient = db.get_member(recipient_member_id)?.ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "unknown recipient member {}",
                        recipient_member_id
                    ))
                })?;
                if recipient
                    .blood_type_id
                    .is_some_and(|recorded| recorded != blood_type.id)
                {
                    return Err(LedgerError::Validation(format!(
                        "recipient {} is not {}",
                        recipient_member_id, blood_type.name
                    )));
                }

                let mut request = TransfusionRequest::new(
                    recipient.member_id,
                    blood_type.id,
                    component.id,
                    requested_volume,
                );
                request.notes = notes;
                db.insert_transfusion_request(&request)?;
                Ok(request)
            })
            .inspect(|request| {
                tracing::info!(
                    request_id = %request.request_id,
                    requested_volume = request.requested_volume,
                    "created transfusion request"
                )
            })
            .inspect_err(|e| log_rejection("create_transfusion_request", recipient_member_id, e))
    }

    pub fn get_transfusion_request(&self, request_id: &str) -> LedgerResult<TransfusionRequest> {
        self.db
            .get_transfusion_request(request_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("transfusion request {}", request_id)))
    }

    pub fn approve_transfusion_request(&self, request_id: &str) -> LedgerResult<TransfusionRequest> {
        self.transition_transfusion(request_id, RequestStatus::Approved)
    }

    pub fn reject_transfusion_request(&self, request_id: &str) -> LedgerResult<TransfusionRequest> {
        self.transition_transfusion(request_id, RequestStatus::Rejected)
    }

    /// Cancel the request. Assigned volume stays with the request's units.
    pub fn cancel_transfusion_request(&self, request_id: &str) -> LedgerResult<TransfusionRequest> {
        self.transition_transfusion(request_id, RequestStatus::Cancelled)
    }

    /// Complete the request, marking every assigned unit as transfused.
    pub fn complete_transfusion_request(
        &self,
        request_id: &str,
    ) -> LedgerResult<TransfusionRequest> {
        self.transition_transfusion(request_id, RequestStatus::Completed)
    }

    /// Requested vs. assigned volume; cancelled assignments do not count.
    pub fn allocation_progress(&self, request_id: &str) -> LedgerResult<AllocationProgress> {
        let request = self.get_transfusion_request(request_id)?;
        let assigned = self.db.assigned_volume_for_request(request_id)?;
        Ok(AllocationProgress::new(request.requested_volume, assigned))
    }

    fn transition_transfusion(
        &self,
        request_id: &str,
        next: RequestStatus,
    ) -> LedgerResult<TransfusionRequest> {
        self.db
            .atomically(|db| {
                let mut request = db.get_transfusion_request(request_id)?.ok_or_else(|| {
                    LedgerError::NotFound(format!("transfusion request {}", request_id))
                })?;
                let previous = request.status;
                if !request.apply_transition(next, now_timestamp()) {
                    return Err(illegal_transition(previous, next));
                }
                db.update_transfusion_request_status(&request)?;

                let settled = match next {
                    RequestStatus::Completed => Some(AssignmentStatus::Transfused),
                    RequestStatus::Cancelled => Some(AssignmentStatus::Cancelled),
                    _ => None,
                };
                if let Some(status) = settled {
                    let rows = db.set_assignment_status_for_request(
                        request_id,
                        AssignmentStatus::Assigned,
                        status,
                    )?;
                    tracing::debug!(request_id = %request_id, rows, status = status.as_str(), "settled assignments");
                }
                Ok(request)
            })
            .inspect(|request| {
                tracing::info!(
                    request_id = %request.request_id,
                    status = request.status.as_str(),
                    "transfusion request status changed"
                )
            })
            .inspect_err(|e| log_rejection("transition_transfusion_request", request_id, e))
    }
}
