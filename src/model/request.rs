use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::attendance::AttendanceStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Leave,
    AttendanceCorrection,
    ProjectAssignment,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Outcome an approver may choose; a decision can never lead back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Casual,
    Emergency,
    Unpaid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeavePayload {
    #[schema(example = "sick")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(default)]
    #[schema(example = "Flu")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceCorrectionPayload {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "17:30:00", value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectAssignmentPayload {
    #[schema(example = "Payroll revamp")]
    pub project: String,
    #[schema(example = "Bank export", nullable = true)]
    pub module: Option<String>,
    #[schema(example = 12, nullable = true)]
    pub team_leader_id: Option<u64>,
    #[schema(example = "2026-03-31", format = "date", value_type = Option<String>)]
    pub deadline: Option<NaiveDate>,
    #[schema(example = "40", value_type = Option<String>)]
    pub estimated_hours: Option<Decimal>,
}

/// Kind-specific request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestPayload {
    Leave(LeavePayload),
    AttendanceCorrection(AttendanceCorrectionPayload),
    ProjectAssignment(ProjectAssignmentPayload),
}

impl RequestPayload {
    /// The kind whose shape this payload has.
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestPayload::Leave(_) => RequestKind::Leave,
            RequestPayload::AttendanceCorrection(_) => RequestKind::AttendanceCorrection,
            RequestPayload::ProjectAssignment(_) => RequestKind::ProjectAssignment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestRecord {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(example = 1000)]
    pub subject_employee_id: u64,
    #[schema(example = 10, nullable = true)]
    pub subject_department_id: Option<u64>,
    pub kind: RequestKind,
    #[schema(value_type = Object)]
    pub payload: RequestPayload,
    pub status: RequestStatus,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub decided_at: Option<DateTime<Utc>>,
    /// user id of the deciding principal
    pub decided_by: Option<u64>,
}

impl RequestRecord {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Decision stamps are present exactly when the request left pending.
    pub fn is_consistent(&self) -> bool {
        let stamped = self.decided_at.is_some() && self.decided_by.is_some();
        let unstamped = self.decided_at.is_none() && self.decided_by.is_none();
        if self.is_pending() { unstamped } else { stamped }
    }
}

/// Selector for listing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    Employee(u64),
    Department(u64),
    Kind(RequestKind),
    All,
}

impl ListScope {
    pub fn matches(&self, record: &RequestRecord) -> bool {
        match *self {
            ListScope::Employee(id) => record.subject_employee_id == id,
            ListScope::Department(id) => record.subject_department_id == Some(id),
            ListScope::Kind(kind) => record.kind == kind,
            ListScope::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn statuses_round_trip_through_strings() {
        assert_eq!(RequestStatus::Approved.to_string(), "APPROVED");
        assert_eq!(RequestStatus::from_str("REJECTED").unwrap(), RequestStatus::Rejected);
        assert_eq!(
            RequestKind::from_str("ATTENDANCE_CORRECTION").unwrap(),
            RequestKind::AttendanceCorrection
        );
        assert_eq!(LeaveType::from_str("unpaid").unwrap(), LeaveType::Unpaid);
    }

    #[test]
    fn payload_is_tagged_by_type() {
        let payload: RequestPayload = serde_json::from_value(serde_json::json!({
            "type": "LEAVE",
            "leave_type": "casual",
            "start_date": "2026-01-01",
            "end_date": "2026-01-02"
        }))
        .unwrap();
        assert_eq!(payload.kind(), RequestKind::Leave);
    }

    #[test]
    fn decision_maps_to_terminal_status() {
        assert_eq!(Decision::Approve.status(), RequestStatus::Approved);
        assert_eq!(Decision::Reject.status(), RequestStatus::Rejected);
    }
}
