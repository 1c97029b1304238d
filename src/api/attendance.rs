use crate::api::error::ApiError;
use crate::auth::auth::AuthUser;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Local, NaiveDate, NaiveTime};
use hrm_workflow::model::{AttendanceEntry, AttendanceStatus, DateRange};
use hrm_workflow::utils::{ColumnMapping, RawRow};
use hrm_workflow::service::SheetImportReport;
use hrm_workflow::workflow::{AttendanceSummary, format_work_minutes};
use hrm_workflow::{Workflow, WorkflowError};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Explicit clock values, accepted from HR/Admin only. Omitted fields default
/// to the server's local now.
#[derive(Deserialize, Default, ToSchema)]
pub struct ClockRequest {
    #[schema(example = "2026-01-05", format = "date", value_type = Option<String>)]
    pub date: Option<NaiveDate>,
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub time: Option<NaiveTime>,
}

impl ClockRequest {
    fn is_explicit(&self) -> bool {
        self.date.is_some() || self.time.is_some()
    }

    /// Employees are clocked by the server; a backdated body is refused.
    fn resolve(
        body: Option<web::Json<ClockRequest>>,
        auth: &AuthUser,
    ) -> actix_web::Result<(NaiveDate, NaiveTime)> {
        let body = body.map(web::Json::into_inner).unwrap_or_default();
        if body.is_explicit() && !auth.principal.is_approver() {
            return Err(actix_web::error::ErrorForbidden(
                "Only HR/Admin may set explicit clock times",
            ));
        }

        let now = Local::now().naive_local();
        Ok((
            body.date.unwrap_or_else(|| now.date()),
            body.time.unwrap_or_else(|| now.time()),
        ))
    }
}

#[derive(Deserialize, ToSchema)]
pub struct StatusOverride {
    pub status: AttendanceStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct ImportSheet {
    pub mapping: ColumnMapping,
    /// Parsed sheet rows, keyed by header
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<RawRow>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PeriodQuery {
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    /// First day (inclusive); defaults to the first of the current month
    pub start: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    /// Last day (inclusive); defaults to today
    pub end: Option<NaiveDate>,
}

impl PeriodQuery {
    fn range(&self) -> Result<DateRange, WorkflowError> {
        let today = Local::now().date_naive();
        let start = self.start.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
        DateRange::new(start, self.end.unwrap_or(today))
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    #[schema(example = "1000,1001")]
    /// Comma-separated employee IDs; defaults to the caller
    pub employee_ids: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub start: Option<NaiveDate>,
    #[schema(example = "2026-01-31", format = "date", value_type = Option<String>)]
    pub end: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryItem {
    pub entry: AttendanceEntry,
    #[schema(example = "8h 30m")]
    pub work_time: String,
}

fn parse_ids(raw: &str) -> Result<Vec<u64>, WorkflowError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| WorkflowError::validation(format!("'{s}' is not an employee id")))
        })
        .collect()
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(content = ClockRequest, description = "Optional explicit date/time (HR/Admin only)"),
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceEntry),
        (status = 409, description = "Already checked in", body = Object, example = json!({
            "message": "duplicate entry: employee 1000 already checked in on 2026-01-05"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    body: Option<web::Json<ClockRequest>>,
) -> actix_web::Result<impl Responder> {
    let employee = auth.employee()?;
    let (date, time) = ClockRequest::resolve(body, &auth)?;

    let entry = workflow
        .check_in(employee.id, date, time)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(entry))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body(content = ClockRequest, description = "Optional explicit date/time (HR/Admin only)"),
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceEntry),
        (status = 400, description = "Check-out earlier than check-in"),
        (status = 404, description = "No check-in found for the date"),
        (status = 409, description = "Already checked out"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    body: Option<web::Json<ClockRequest>>,
) -> actix_web::Result<impl Responder> {
    let employee = auth.employee()?;
    let (date, time) = ClockRequest::resolve(body, &auth)?;

    let entry = workflow
        .check_out(employee.id, date, time)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(entry))
}

/// Administrative status override (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/attendance/{employee_id}/{date}/status",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        ("date" = String, Path, description = "Attendance date (YYYY-MM-DD)")
    ),
    request_body = StatusOverride,
    responses(
        (status = 200, description = "Status set", body = AttendanceEntry),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn set_status(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<(u64, NaiveDate)>,
    body: web::Json<StatusOverride>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (employee_id, date) = path.into_inner();

    let entry = workflow
        .set_attendance_status(employee_id, date, body.status, &auth.principal)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(entry))
}

/// Bulk import of sheet rows through an explicit column mapping (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/attendance/import",
    request_body = ImportSheet,
    responses(
        (status = 200, description = "Per-row import report", body = SheetImportReport),
        (status = 400, description = "Unsupported column mapping"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn import_sheet(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    body: web::Json<ImportSheet>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let ImportSheet { mapping, rows } = body.into_inner();

    let report = workflow
        .import_sheet(&mapping, rows)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(report))
}

/// Aggregated attendance for one employee or a team
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceSummary),
        (status = 400, description = "Invalid range or employee list"),
        (status = 403, description = "Employees may only summarize themselves")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn summary(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let range = PeriodQuery {
        start: query.start,
        end: query.end,
    }
    .range()
    .map_err(ApiError::from)?;

    let employee_ids = match query.employee_ids.as_deref() {
        Some(raw) => parse_ids(raw).map_err(ApiError::from)?,
        None => vec![auth.employee()?.id],
    };
    for id in &employee_ids {
        auth.require_self_or_approver(*id)?;
    }

    Ok(HttpResponse::Ok().json(workflow.summarize_attendance(&employee_ids, range)))
}

/// The caller's own attendance history
#[utoipa::path(
    get,
    path = "/api/attendance/my",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Date-ordered history", body = [HistoryItem]),
        (status = 400, description = "start is after end"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    let employee = auth.employee()?;
    let range = query.range().map_err(ApiError::from)?;

    let items: Vec<HistoryItem> = workflow
        .attendance_history(employee.id, range)
        .into_iter()
        .map(|entry| HistoryItem {
            work_time: format_work_minutes(entry.work_minutes),
            entry,
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_ids() {
        assert_eq!(parse_ids("1, 2,,3").unwrap(), vec![1, 2, 3]);
        assert!(matches!(parse_ids("1,x"), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn rejects_inverted_period() {
        let query = PeriodQuery {
            start: NaiveDate::from_ymd_opt(2026, 2, 1),
            end: NaiveDate::from_ymd_opt(2026, 1, 1),
        };
        assert!(query.range().is_err());
    }
}
