use crate::api::attendance::{
    ClockRequest, HistoryItem, ImportSheet, PeriodQuery, StatusOverride, SummaryQuery,
};
use crate::api::payroll::{ComputeNet, IssuePayslip, RunPayroll};
use crate::api::performance::EfficiencyInput;
use crate::api::requests::{RequestFilter, SubmitRequest};
use hrm_workflow::model::{
    Adjustment, AdjustmentKind, AttendanceEntry, AttendanceStatus, BreakdownLine, ImportRow,
    NetPay, PayPeriod, PayrollLine, RequestKind, RequestRecord, RequestStatus,
};
use hrm_workflow::service::{Efficiency, SheetImportReport, UnmappedRow};
use hrm_workflow::utils::ColumnMapping;
use hrm_workflow::workflow::{
    AttendanceSummary, ImportReport, PayrollRun, Payslip, PeriodAnalytics, RejectedRow,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Workflow API",
        version = "1.0.0",
        description = r#"
## HRM approval workflow and derived metrics

Back-end for the HR console's approval inbox, attendance ledger and payroll.

### Key Features
- **Requests**
  - Submit leave, attendance-correction and project-assignment requests; approve or reject them once
- **Attendance**
  - Check-in / check-out with derived work minutes, status overrides, sheet import with per-row results, summaries
- **Payroll**
  - Itemized net pay from a base amount and adjustments, stored payslips, per-period runs with analytics
- **Performance**
  - Estimated-vs-actual efficiency with a configurable display ceiling

### Security
All endpoints require a **JWT Bearer** access token.
Decisions and overrides are limited to **HR** and **Admin**; payroll to **Admin**.

### Errors
Failures return `{"message": ...}` with 400 (validation), 404 (not found) or 409 (duplicate / invalid transition).
"#,
    ),
    paths(
        crate::api::requests::submit_request,
        crate::api::requests::list_requests,
        crate::api::requests::get_request,
        crate::api::requests::approve_request,
        crate::api::requests::reject_request,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::set_status,
        crate::api::attendance::import_sheet,
        crate::api::attendance::summary,
        crate::api::attendance::my_attendance,

        crate::api::payroll::compute,
        crate::api::payroll::issue_payslip,
        crate::api::payroll::get_payslip,
        crate::api::payroll::run,

        crate::api::performance::efficiency
    ),
    components(
        schemas(
            SubmitRequest,
            RequestFilter,
            RequestRecord,
            RequestKind,
            RequestStatus,
            ClockRequest,
            StatusOverride,
            ImportSheet,
            PeriodQuery,
            SummaryQuery,
            HistoryItem,
            AttendanceEntry,
            AttendanceStatus,
            AttendanceSummary,
            ImportRow,
            ImportReport,
            RejectedRow,
            SheetImportReport,
            UnmappedRow,
            ColumnMapping,
            ComputeNet,
            IssuePayslip,
            RunPayroll,
            Adjustment,
            AdjustmentKind,
            BreakdownLine,
            NetPay,
            PayPeriod,
            PayrollLine,
            Payslip,
            PayrollRun,
            PeriodAnalytics,
            EfficiencyInput,
            Efficiency
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Requests", description = "Approval workflow APIs"),
        (name = "Attendance", description = "Attendance ledger APIs"),
        (name = "Payroll", description = "Payroll computation APIs"),
        (name = "Performance", description = "Performance metric APIs"),
    )
)]
pub struct ApiDoc;
