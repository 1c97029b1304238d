use actix_web::{HttpResponse, Responder, web};
use hrm_workflow::Workflow;
use hrm_workflow::model::{Adjustment, NetPay, PayPeriod, PayrollLine};
use hrm_workflow::workflow::{PayrollRun, Payslip, compute_net};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::auth::auth::AuthUser;

#[derive(Deserialize, ToSchema)]
pub struct ComputeNet {
    #[schema(example = "1000", value_type = String)]
    pub base_amount: Decimal,

    #[schema(example = json!([
        {"kind": "INCREMENT_PERCENT", "value": "10"},
        {"kind": "REFERRAL_BONUS", "value": "500"},
        {"kind": "DEDUCTION", "value": "200"}
    ]))]
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
}

#[derive(Deserialize, ToSchema)]
pub struct IssuePayslip {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = 1)]
    pub month: u32,

    #[schema(example = "50000", value_type = String)]
    pub base_amount: Decimal,

    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
}

impl IssuePayslip {
    fn into_line(self) -> Result<PayrollLine, ApiError> {
        let period = PayPeriod::new(self.year, self.month)?;
        Ok(PayrollLine::new(
            self.employee_id,
            period,
            self.base_amount,
            self.adjustments,
        )?)
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RunPayroll {
    pub period: PayPeriod,
    pub lines: Vec<PayrollLine>,
}

/* =========================
Compute net pay (Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/payroll/compute",
    request_body = ComputeNet,
    responses(
        (status = 200, description = "Itemized net pay", body = NetPay, example = json!({
            "net_amount": "1400",
            "breakdown": [
                {"label": "Base", "amount": "1000"},
                {"label": "Increment", "amount": "100"},
                {"label": "Referral Bonus", "amount": "500"},
                {"label": "Deduction", "amount": "-200"}
            ]
        })),
        (status = 400, description = "Negative base or adjustment"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payroll"
)]
pub async fn compute(
    auth: AuthUser,
    body: web::Json<ComputeNet>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let pay = compute_net(body.base_amount, &body.adjustments).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(pay))
}

/* =========================
Issue payslip (Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = IssuePayslip,
    responses(
        (status = 200, description = "Payslip stored and returned", body = Payslip),
        (status = 400, description = "Invalid period or amounts"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payroll"
)]
pub async fn issue_payslip(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    body: web::Json<IssuePayslip>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let line = body.into_inner().into_line()?;
    let payslip = workflow.issue_payslip(line).await.map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(payslip))
}

/* =========================
Get payslip (Admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/payroll/{employee_id}/{year}/{month}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        ("year" = i32, Path, description = "Period year"),
        ("month" = u32, Path, description = "Period month (1-12)")
    ),
    responses(
        (status = 200, description = "Stored inputs with recomputed pay", body = Payslip),
        (status = 400, description = "Invalid period"),
        (status = 404, description = "No payroll for that employee and period"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payroll"
)]
pub async fn get_payslip(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<(u64, i32, u32)>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let (employee_id, year, month) = path.into_inner();

    let period = PayPeriod::new(year, month).map_err(ApiError::from)?;
    let payslip = workflow
        .load_payslip(employee_id, period)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(payslip))
}

/* =========================
Run payroll for a period (Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/payroll/run",
    request_body = RunPayroll,
    responses(
        (status = 200, description = "Payslips and period analytics", body = PayrollRun),
        (status = 400, description = "A line is invalid or belongs to another period"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payroll"
)]
pub async fn run(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    body: web::Json<RunPayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let RunPayroll { period, lines } = body.into_inner();

    let run = workflow
        .run_payroll(period, lines)
        .await
        .map_err(ApiError::from)?;

    tracing::info!(
        period = %run.analytics.period,
        headcount = run.analytics.headcount,
        total_net = %run.analytics.total_net,
        "Payroll run completed"
    );
    Ok(HttpResponse::Ok().json(run))
}
