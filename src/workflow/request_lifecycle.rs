use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{read, write};
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{
    DateRange, Decision, Employee, ListScope, Principal, RequestKind, RequestPayload,
    RequestRecord, RequestStatus,
};

#[derive(Default)]
struct RequestBook {
    /// submission order
    records: Vec<RequestRecord>,
    index: HashMap<Uuid, usize>,
}

impl RequestBook {
    fn insert(&mut self, record: RequestRecord) {
        self.index.insert(record.id, self.records.len());
        self.records.push(record);
    }

    fn get_mut(&mut self, id: &Uuid) -> Option<&mut RequestRecord> {
        let slot = *self.index.get(id)?;
        self.records.get_mut(slot)
    }

    fn remove(&mut self, id: &Uuid) -> Option<RequestRecord> {
        let slot = *self.index.get(id)?;
        if slot >= self.records.len() {
            return None;
        }
        self.index.remove(id);
        let record = self.records.remove(slot);
        for (offset, later) in self.records[slot..].iter().enumerate() {
            self.index.insert(later.id, slot + offset);
        }
        Some(record)
    }
}

/// PENDING -> APPROVED | REJECTED state machine for any approvable request.
#[derive(Default)]
pub struct RequestLifecycle {
    book: RwLock<RequestBook>,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `payload` against `kind` and records a new pending request.
    pub fn submit(
        &self,
        subject: &Employee,
        kind: RequestKind,
        payload: RequestPayload,
    ) -> WorkflowResult<RequestRecord> {
        if let Err(e) = validate_payload(kind, &payload) {
            debug!(employee_id = subject.id, %kind, error = %e, "Request payload rejected");
            return Err(e);
        }

        let record = RequestRecord {
            id: Uuid::new_v4(),
            subject_employee_id: subject.id,
            subject_department_id: subject.department_id,
            kind,
            payload,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        };

        write(&self.book).insert(record.clone());

        info!(request_id = %record.id, employee_id = subject.id, %kind, "Request submitted");
        Ok(record)
    }

    /// Moves a pending request to its terminal state. A decided request never changes again.
    pub fn decide(
        &self,
        request_id: Uuid,
        decision: Decision,
        decided_by: &Principal,
    ) -> WorkflowResult<RequestRecord> {
        let mut book = write(&self.book);

        let record = book
            .get_mut(&request_id)
            .ok_or_else(|| WorkflowError::not_found(format!("request {request_id}")))?;

        if !record.is_pending() {
            warn!(
                %request_id,
                status = %record.status,
                user_id = decided_by.user_id,
                "Attempt to decide an already decided request"
            );
            return Err(WorkflowError::invalid_transition(format!(
                "request {request_id} is already {}",
                record.status
            )));
        }

        record.status = decision.status();
        record.decided_at = Some(Utc::now());
        record.decided_by = Some(decided_by.user_id);

        info!(
            %request_id,
            status = %record.status,
            user_id = decided_by.user_id,
            "Request decided"
        );
        Ok(record.clone())
    }

    /// Takes back a submit or decision the caller could not store: a pending
    /// record is dropped, a decided one returns to PENDING. Returns false and
    /// leaves the book alone once the record has moved past `applied`.
    pub(crate) fn rollback(&self, applied: &RequestRecord) -> bool {
        let mut book = write(&self.book);
        let Some(current) = book.get_mut(&applied.id) else {
            return false;
        };
        if *current != *applied {
            warn!(request_id = %applied.id, status = %current.status, "Request changed since the write; not rolled back");
            return false;
        }

        if applied.is_pending() {
            book.remove(&applied.id);
        } else {
            current.status = RequestStatus::Pending;
            current.decided_at = None;
            current.decided_by = None;
        }
        debug!(request_id = %applied.id, "Request write rolled back");
        true
    }

    pub fn get(&self, request_id: Uuid) -> WorkflowResult<RequestRecord> {
        let book = read(&self.book);
        book.index
            .get(&request_id)
            .and_then(|slot| book.records.get(*slot))
            .cloned()
            .ok_or_else(|| WorkflowError::not_found(format!("request {request_id}")))
    }

    /// Requests matching `scope`, optionally narrowed by status, in submission order.
    pub fn list_for(&self, scope: ListScope, status: Option<RequestStatus>) -> Vec<RequestRecord> {
        read(&self.book)
            .records
            .iter()
            .filter(|r| scope.matches(r))
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect()
    }

    /// Loads a persisted record as-is.
    pub fn restore(&self, record: RequestRecord) -> WorkflowResult<()> {
        if record.payload.kind() != record.kind {
            return Err(WorkflowError::validation(format!(
                "request {} has a {} payload but kind {}",
                record.id,
                record.payload.kind(),
                record.kind
            )));
        }
        if !record.is_consistent() {
            return Err(WorkflowError::validation(format!(
                "request {} decision stamps do not match status {}",
                record.id, record.status
            )));
        }

        let mut book = write(&self.book);
        if book.index.contains_key(&record.id) {
            return Err(WorkflowError::duplicate(format!("request {}", record.id)));
        }
        book.insert(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        read(&self.book).records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_payload(kind: RequestKind, payload: &RequestPayload) -> WorkflowResult<()> {
    if payload.kind() != kind {
        return Err(WorkflowError::validation(format!(
            "payload shape {} does not match request kind {kind}",
            payload.kind()
        )));
    }

    match payload {
        RequestPayload::Leave(leave) => {
            DateRange::new(leave.start_date, leave.end_date)?;
        }
        RequestPayload::AttendanceCorrection(correction) => {
            if correction.check_in.is_none()
                && correction.check_out.is_none()
                && correction.status.is_none()
            {
                return Err(WorkflowError::validation(
                    "attendance correction must change check_in, check_out or status",
                ));
            }
            if let (Some(check_in), Some(check_out)) = (correction.check_in, correction.check_out) {
                if check_out < check_in {
                    return Err(WorkflowError::validation(format!(
                        "corrected check_out {check_out} cannot precede check_in {check_in}"
                    )));
                }
            }
        }
        RequestPayload::ProjectAssignment(assignment) => {
            if assignment.project.trim().is_empty() {
                return Err(WorkflowError::validation("project name must not be empty"));
            }
            if assignment.estimated_hours.is_some_and(|h| h < Decimal::ZERO) {
                return Err(WorkflowError::validation("estimated_hours cannot be negative"));
            }
        }
    }
    Ok(())
}
