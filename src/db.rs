use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures_util::StreamExt;
use hrm_workflow::Workflow;
use hrm_workflow::model::{
    Adjustment, AttendanceEntry, AttendanceStatus, PayPeriod, PayrollLine, RequestKind,
    RequestRecord, RequestStatus,
};
use hrm_workflow::persistence::{Persistence, PersistenceError, Record, RecordKey};
use rust_decimal::Decimal;
use sqlx::MySqlPool;
use tracing::{info, warn};
use uuid::Uuid;

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")
}

type RequestRow = (
    String,
    u64,
    Option<u64>,
    String,
    String,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<u64>,
);

type AttendanceRow = (
    u64,
    NaiveDate,
    Option<NaiveTime>,
    Option<NaiveTime>,
    String,
    u32,
    Option<u64>,
);

type PayrollRow = (u64, i32, u32, Decimal, String);

/// MySQL-backed record store. Tables: `workflow_requests`, `attendance`, `payroll_lines`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn load_request(&self, id: Uuid) -> Result<Option<Record>, PersistenceError> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, subject_employee_id, subject_department_id, kind, payload, status,
                   created_at, decided_at, decided_by
            FROM workflow_requests
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(request_from_row)
            .transpose()
            .map(|r| r.map(Record::Request))
    }

    async fn load_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<Record>, PersistenceError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT employee_id, date, check_in, check_out, status, work_minutes, status_set_by
            FROM attendance
            WHERE employee_id = ? AND date = ?
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(attendance_from_row)
            .transpose()
            .map(|e| e.map(Record::Attendance))
    }

    async fn load_payroll(
        &self,
        employee_id: u64,
        period: PayPeriod,
    ) -> Result<Option<Record>, PersistenceError> {
        let row = sqlx::query_as::<_, PayrollRow>(
            r#"
            SELECT employee_id, period_year, period_month, base_amount, adjustments
            FROM payroll_lines
            WHERE employee_id = ? AND period_year = ? AND period_month = ?
            "#,
        )
        .bind(employee_id)
        .bind(period.year())
        .bind(period.month())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(payroll_from_row)
            .transpose()
            .map(|l| l.map(Record::Payroll))
    }

    async fn save_request(&self, record: &RequestRecord) -> Result<(), PersistenceError> {
        match RequestWrite::for_record(record) {
            RequestWrite::Submit => self.insert_request(record).await,
            RequestWrite::Decide => self.decide_request(record).await,
        }
    }

    async fn insert_request(&self, record: &RequestRecord) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(&record.payload)?;
        sqlx::query(
            r#"
            INSERT IGNORE INTO workflow_requests
                (id, subject_employee_id, subject_department_id, kind, payload, status,
                 created_at, decided_at, decided_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, NULL, NULL)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.subject_employee_id)
        .bind(record.subject_department_id)
        .bind(record.kind.as_ref())
        .bind(payload)
        .bind(record.status.as_ref())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    /// Same guard as the approve/reject handlers: only a row still PENDING
    /// takes a decision, so two instances cannot both decide one request.
    async fn decide_request(&self, record: &RequestRecord) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_requests
            SET status = ?, decided_at = ?, decided_by = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(record.status.as_ref())
        .bind(record.decided_at)
        .bind(record.decided_by)
        .bind(record.id.to_string())
        .bind(RequestStatus::Pending.as_ref())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        decision_applied(record, result.rows_affected())
    }

    async fn save_attendance(&self, entry: &AttendanceEntry) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, date, check_in, check_out, status, work_minutes, status_set_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                check_in = VALUES(check_in),
                check_out = VALUES(check_out),
                status = VALUES(status),
                work_minutes = VALUES(work_minutes),
                status_set_by = VALUES(status_set_by)
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.date)
        .bind(entry.check_in)
        .bind(entry.check_out)
        .bind(entry.status.as_ref())
        .bind(entry.work_minutes)
        .bind(entry.status_set_by)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn save_payroll(&self, line: &PayrollLine) -> Result<(), PersistenceError> {
        let adjustments = serde_json::to_string(&line.adjustments)?;
        sqlx::query(
            r#"
            INSERT INTO payroll_lines
                (employee_id, period_year, period_month, base_amount, adjustments)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                base_amount = VALUES(base_amount),
                adjustments = VALUES(adjustments)
            "#,
        )
        .bind(line.employee_id)
        .bind(line.period.year())
        .bind(line.period.month())
        .bind(line.base_amount)
        .bind(adjustments)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl Persistence for MySqlStore {
    async fn load(&self, key: &RecordKey) -> Result<Option<Record>, PersistenceError> {
        match *key {
            RecordKey::Request(id) => self.load_request(id).await,
            RecordKey::Attendance(k) => self.load_attendance(k.employee_id, k.date).await,
            RecordKey::Payroll {
                employee_id,
                period,
            } => self.load_payroll(employee_id, period).await,
        }
    }

    async fn save(&self, record: &Record) -> Result<(), PersistenceError> {
        match record {
            Record::Request(r) => self.save_request(r).await,
            Record::Attendance(e) => self.save_attendance(e).await,
            Record::Payroll(l) => self.save_payroll(l).await,
        }
    }
}

/// Streams stored requests and attendance into the in-memory components.
/// Rows that fail to decode or restore are logged and skipped.
pub async fn hydrate(pool: &MySqlPool, workflow: &Workflow) -> Result<()> {
    let mut requests = sqlx::query_as::<_, RequestRow>(
        r#"
        SELECT id, subject_employee_id, subject_department_id, kind, payload, status,
               created_at, decided_at, decided_by
        FROM workflow_requests
        ORDER BY created_at ASC
        "#,
    )
    .fetch(pool);

    let mut request_count = 0usize;
    while let Some(row) = requests.next().await {
        let restored = request_from_row(row?)
            .map_err(|e| e.to_string())
            .and_then(|record| workflow.requests().restore(record).map_err(|e| e.to_string()));
        match restored {
            Ok(()) => request_count += 1,
            Err(e) => warn!(error = %e, "Skipping stored request"),
        }
    }

    let mut entries = sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT employee_id, date, check_in, check_out, status, work_minutes, status_set_by
        FROM attendance
        ORDER BY employee_id, date
        "#,
    )
    .fetch(pool);

    let mut attendance_count = 0usize;
    while let Some(row) = entries.next().await {
        let restored = attendance_from_row(row?)
            .map_err(|e| e.to_string())
            .and_then(|entry| workflow.attendance().restore(entry).map_err(|e| e.to_string()));
        match restored {
            Ok(()) => attendance_count += 1,
            Err(e) => warn!(error = %e, "Skipping stored attendance entry"),
        }
    }

    info!(
        requests = request_count,
        attendance = attendance_count,
        "Workflow state loaded from database"
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestWrite {
    Submit,
    Decide,
}

impl RequestWrite {
    fn for_record(record: &RequestRecord) -> Self {
        if record.is_pending() {
            RequestWrite::Submit
        } else {
            RequestWrite::Decide
        }
    }
}

fn decision_applied(record: &RequestRecord, rows_affected: u64) -> Result<(), PersistenceError> {
    if rows_affected == 0 {
        warn!(request_id = %record.id, status = %record.status, "Request already decided in the store");
        return Err(PersistenceError::Conflict(format!(
            "request {} is no longer pending",
            record.id
        )));
    }
    Ok(())
}

fn backend(e: sqlx::Error) -> PersistenceError {
    PersistenceError::Backend(e.to_string())
}

fn column<T: FromStr>(name: &str, raw: &str) -> Result<T, PersistenceError> {
    T::from_str(raw)
        .map_err(|_| PersistenceError::Backend(format!("unknown {name} value '{raw}'")))
}

fn request_from_row(row: RequestRow) -> Result<RequestRecord, PersistenceError> {
    let (id, subject, department, kind, payload, status, created_at, decided_at, decided_by) = row;
    Ok(RequestRecord {
        id: Uuid::parse_str(&id)
            .map_err(|e| PersistenceError::Backend(format!("bad request id '{id}': {e}")))?,
        subject_employee_id: subject,
        subject_department_id: department,
        kind: column::<RequestKind>("kind", &kind)?,
        payload: serde_json::from_str(&payload)?,
        status: column::<RequestStatus>("status", &status)?,
        created_at,
        decided_at,
        decided_by,
    })
}

fn attendance_from_row(row: AttendanceRow) -> Result<AttendanceEntry, PersistenceError> {
    let (employee_id, date, check_in, check_out, status, work_minutes, status_set_by) = row;
    Ok(AttendanceEntry {
        employee_id,
        date,
        check_in,
        check_out,
        status: column::<AttendanceStatus>("status", &status)?,
        work_minutes,
        status_set_by,
    })
}

fn payroll_from_row(row: PayrollRow) -> Result<PayrollLine, PersistenceError> {
    let (employee_id, year, month, base_amount, adjustments) = row;
    let period = PayPeriod::new(year, month)
        .map_err(|e| PersistenceError::Backend(e.to_string()))?;
    let adjustments: Vec<Adjustment> = serde_json::from_str(&adjustments)?;
    Ok(PayrollLine {
        employee_id,
        period,
        base_amount,
        adjustments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrm_workflow::model::{LeavePayload, LeaveType, RequestPayload};
    use rust_decimal_macros::dec;

    #[test]
    fn decodes_request_rows() {
        let payload = RequestPayload::Leave(LeavePayload {
            leave_type: LeaveType::Sick,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
            reason: "flu".into(),
        });
        let id = Uuid::new_v4();
        let row: RequestRow = (
            id.to_string(),
            7,
            Some(3),
            "LEAVE".into(),
            serde_json::to_string(&payload).unwrap(),
            "PENDING".into(),
            Utc::now(),
            None,
            None,
        );
        let record = request_from_row(row).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.kind, RequestKind::Leave);
        assert_eq!(record.status, RequestStatus::Pending);
        assert_eq!(record.payload, payload);
    }

    #[test]
    fn decisions_only_land_on_pending_rows() {
        let payload = RequestPayload::Leave(LeavePayload {
            leave_type: LeaveType::Casual,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            reason: "errand".into(),
        });
        let mut record = RequestRecord {
            id: Uuid::new_v4(),
            subject_employee_id: 7,
            subject_department_id: None,
            kind: RequestKind::Leave,
            payload,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        };
        assert_eq!(RequestWrite::for_record(&record), RequestWrite::Submit);

        record.status = RequestStatus::Approved;
        record.decided_at = Some(Utc::now());
        record.decided_by = Some(2);
        assert_eq!(RequestWrite::for_record(&record), RequestWrite::Decide);

        assert!(decision_applied(&record, 1).is_ok());
        assert!(matches!(
            decision_applied(&record, 0),
            Err(PersistenceError::Conflict(_))
        ));
    }

    #[test]
    fn rejects_unknown_status_column() {
        let row: AttendanceRow = (
            1,
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            None,
            None,
            "ON_VACATION".into(),
            0,
            None,
        );
        assert!(matches!(
            attendance_from_row(row),
            Err(PersistenceError::Backend(_))
        ));
    }

    #[test]
    fn decodes_payroll_rows() {
        let row: PayrollRow = (
            9,
            2026,
            3,
            dec!(1000),
            r#"[{"kind":"TAX","value":"50"}]"#.into(),
        );
        let line = payroll_from_row(row).unwrap();
        assert_eq!(line.period, PayPeriod::new(2026, 3).unwrap());
        assert_eq!(line.adjustments, vec![Adjustment::tax(dec!(50))]);

        let bad: PayrollRow = (9, 2026, 13, dec!(1000), "[]".into());
        assert!(payroll_from_row(bad).is_err());
    }
}
