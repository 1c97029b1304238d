use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::model::{
    AttendanceEntry, AttendanceStatus, DateRange, Decision, Employee, ImportRow, ListScope,
    PayPeriod, PayrollLine, Principal, RequestKind, RequestPayload, RequestRecord, RequestStatus,
};
use crate::notify::{EventType, NotificationEvent, Notifier};
use crate::persistence::{Persistence, PersistenceError, Record, RecordKey};
use crate::utils::{ColumnMapping, RawRow};
use crate::workflow::attendance_ledger::Applied;
use crate::workflow::{
    AttendanceLedger, AttendanceSummary, DisplayPolicy, ImportReport, PayrollRun, Payslip,
    RejectedRow, RequestLifecycle, efficiency_percent, run_payroll,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Efficiency {
    /// unclamped
    #[schema(example = "187.5", value_type = String)]
    pub percent: Decimal,
    #[schema(example = "150", value_type = String)]
    pub display_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UnmappedRow {
    pub line: usize,
    #[schema(value_type = Object)]
    pub reason: WorkflowError,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SheetImportReport {
    pub report: ImportReport,
    pub unmapped: Vec<UnmappedRow>,
}

/// Reference caller: runs a component operation, forwards the outcome to
/// persistence, then notifies. A change the store refused is taken back.
pub struct Workflow {
    requests: RequestLifecycle,
    attendance: AttendanceLedger,
    persistence: Arc<dyn Persistence>,
    notifier: Arc<dyn Notifier>,
    display: DisplayPolicy,
}

impl Workflow {
    pub fn new(persistence: Arc<dyn Persistence>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            requests: RequestLifecycle::new(),
            attendance: AttendanceLedger::new(),
            persistence,
            notifier,
            display: DisplayPolicy::default(),
        }
    }

    pub fn with_display_policy(mut self, display: DisplayPolicy) -> Self {
        self.display = display;
        self
    }

    pub fn requests(&self) -> &RequestLifecycle {
        &self.requests
    }

    pub fn attendance(&self) -> &AttendanceLedger {
        &self.attendance
    }

    /* =========================
    Requests
    ========================= */

    pub async fn submit_request(
        &self,
        subject: &Employee,
        kind: RequestKind,
        payload: RequestPayload,
    ) -> ServiceResult<RequestRecord> {
        let record = self.requests.submit(subject, kind, payload)?;
        self.persist_or_else(Record::Request(record.clone()), || {
            self.requests.rollback(&record);
        })
        .await?;
        self.notify(
            EventType::RequestSubmitted,
            record.subject_employee_id,
            json!({ "request_id": record.id, "kind": record.kind }),
        );
        Ok(record)
    }

    pub async fn decide_request(
        &self,
        request_id: Uuid,
        decision: Decision,
        decided_by: &Principal,
    ) -> ServiceResult<RequestRecord> {
        let record = self.requests.decide(request_id, decision, decided_by)?;
        self.persist_or_else(Record::Request(record.clone()), || {
            self.requests.rollback(&record);
        })
        .await?;

        let event_type = match record.status {
            RequestStatus::Rejected => EventType::RequestRejected,
            _ => EventType::RequestApproved,
        };
        self.notify(
            event_type,
            record.subject_employee_id,
            json!({ "request_id": record.id, "kind": record.kind, "decided_by": decided_by.user_id }),
        );
        Ok(record)
    }

    pub fn get_request(&self, request_id: Uuid) -> ServiceResult<RequestRecord> {
        Ok(self.requests.get(request_id)?)
    }

    pub fn list_requests(
        &self,
        scope: ListScope,
        status: Option<RequestStatus>,
    ) -> Vec<RequestRecord> {
        self.requests.list_for(scope, status)
    }

    /* =========================
    Attendance
    ========================= */

    pub async fn check_in(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ServiceResult<AttendanceEntry> {
        let applied = self.attendance.apply_check_in(employee_id, date, time)?;
        let entry = self.persist_attendance(applied).await?;
        self.notify(
            EventType::CheckedIn,
            employee_id,
            json!({ "date": date, "check_in": time }),
        );
        Ok(entry)
    }

    pub async fn check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        time: NaiveTime,
    ) -> ServiceResult<AttendanceEntry> {
        let applied = self.attendance.apply_check_out(employee_id, date, time)?;
        let entry = self.persist_attendance(applied).await?;
        self.notify(
            EventType::CheckedOut,
            employee_id,
            json!({ "date": date, "check_out": time, "work_minutes": entry.work_minutes }),
        );
        Ok(entry)
    }

    pub async fn set_attendance_status(
        &self,
        employee_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        actor: &Principal,
    ) -> ServiceResult<AttendanceEntry> {
        let applied = self.attendance.apply_status(employee_id, date, status, actor)?;
        let entry = self.persist_attendance(applied).await?;
        self.notify(
            EventType::AttendanceOverridden,
            employee_id,
            json!({ "date": date, "status": status, "set_by": actor.user_id }),
        );
        Ok(entry)
    }

    pub async fn import_attendance(&self, rows: Vec<ImportRow>) -> ServiceResult<ImportReport> {
        let report = self.attendance.bulk_import(rows);
        self.persist_imported(&report.entries).await?;
        Ok(report)
    }

    /// Maps raw sheet rows through `mapping`, then imports them row by row.
    pub async fn import_sheet(
        &self,
        mapping: &ColumnMapping,
        rows: Vec<RawRow>,
    ) -> ServiceResult<SheetImportReport> {
        mapping.validate()?;

        let mut entries = Vec::new();
        let mut rejected = Vec::new();
        let mut unmapped = Vec::new();

        for (i, raw) in rows.iter().enumerate() {
            let line = i + 1;
            let row = match mapping.map_row(raw) {
                Ok(row) => row,
                Err(reason) => {
                    warn!(line, error = %reason, "Import row could not be mapped");
                    unmapped.push(UnmappedRow { line, reason });
                    continue;
                }
            };
            match self.attendance.import_row(&row) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    warn!(line, employee_id = row.employee_id, error = %reason, "Import row rejected");
                    rejected.push(RejectedRow { line, row, reason });
                }
            }
        }

        self.persist_imported(&entries).await?;
        info!(
            accepted = entries.len(),
            rejected = rejected.len(),
            unmapped = unmapped.len(),
            mapping_version = mapping.version,
            "Sheet import finished"
        );

        Ok(SheetImportReport {
            report: ImportReport {
                accepted: entries.len(),
                entries,
                rejected,
            },
            unmapped,
        })
    }

    pub fn attendance_history(&self, employee_id: u64, range: DateRange) -> Vec<AttendanceEntry> {
        self.attendance.entries_for(employee_id, range)
    }

    pub fn summarize_attendance(&self, employee_ids: &[u64], range: DateRange) -> AttendanceSummary {
        self.attendance.summarize_team(employee_ids, range)
    }

    /* =========================
    Payroll
    ========================= */

    pub async fn issue_payslip(&self, line: PayrollLine) -> ServiceResult<Payslip> {
        let payslip = Payslip::for_line(line)?;
        self.persist(Record::Payroll(payslip.line.clone())).await?;
        self.notify(
            EventType::PayslipIssued,
            payslip.line.employee_id,
            json!({ "period": payslip.line.period.to_string(), "net_amount": payslip.pay.net_amount }),
        );
        Ok(payslip)
    }

    /// Loads the stored inputs and recomputes the pay.
    pub async fn load_payslip(&self, employee_id: u64, period: PayPeriod) -> ServiceResult<Payslip> {
        let key = RecordKey::Payroll {
            employee_id,
            period,
        };
        match self.persistence.load(&key).await? {
            Some(Record::Payroll(line)) => Ok(Payslip::for_line(line)?),
            Some(other) => Err(PersistenceError::Backend(format!(
                "expected a payroll line for {key:?}, found {:?}",
                other.key()
            ))
            .into()),
            None => Err(WorkflowError::not_found(format!(
                "payroll for employee {employee_id} in {period}"
            ))
            .into()),
        }
    }

    pub async fn run_payroll(
        &self,
        period: PayPeriod,
        lines: Vec<PayrollLine>,
    ) -> ServiceResult<PayrollRun> {
        let run = run_payroll(period, lines)?;
        for payslip in &run.payslips {
            self.persist(Record::Payroll(payslip.line.clone())).await?;
        }
        Ok(run)
    }

    pub fn efficiency(&self, estimated: Decimal, actual: Decimal) -> ServiceResult<Efficiency> {
        let percent = efficiency_percent(estimated, actual)?;
        Ok(Efficiency {
            percent,
            display_percent: self.display.clamp(percent),
        })
    }

    /* =========================
    Collaborators
    ========================= */

    async fn persist(&self, record: Record) -> ServiceResult<()> {
        self.persistence.save(&record).await.map_err(|e| {
            error!(error = %e, key = ?record.key(), "Failed to persist record");
            ServiceError::from(e)
        })
    }

    /// Runs `undo` when the save fails, so the component never holds a
    /// change the store does not.
    async fn persist_or_else(&self, record: Record, undo: impl FnOnce()) -> ServiceResult<()> {
        let saved = self.persist(record).await;
        if saved.is_err() {
            undo();
        }
        saved
    }

    async fn persist_attendance(&self, applied: Applied) -> ServiceResult<AttendanceEntry> {
        let entry = applied.entry.clone();
        self.persist_or_else(Record::Attendance(entry.clone()), || {
            self.attendance.rollback(applied);
        })
        .await?;
        Ok(entry)
    }

    /// Entries stored before a failed save stay; the failed one and every
    /// later one are taken back out of the ledger.
    async fn persist_imported(&self, entries: &[AttendanceEntry]) -> ServiceResult<()> {
        let mut per_employee: BTreeMap<u64, usize> = BTreeMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if let Err(e) = self.persist(Record::Attendance(entry.clone())).await {
                for unsaved in &entries[i..] {
                    self.attendance.rollback(Applied {
                        entry: unsaved.clone(),
                        previous: None,
                    });
                }
                warn!(stored = i, dropped = entries.len() - i, "Attendance import stopped by a failed save");
                return Err(e);
            }
            *per_employee.entry(entry.employee_id).or_insert(0) += 1;
        }
        for (employee_id, count) in per_employee {
            self.notify(
                EventType::AttendanceImported,
                employee_id,
                json!({ "entries": count }),
            );
        }
        Ok(())
    }

    fn notify(&self, event_type: EventType, subject_employee_id: u64, details: serde_json::Value) {
        self.notifier.notify(NotificationEvent {
            event_type,
            subject_employee_id,
            details,
        });
    }
}
