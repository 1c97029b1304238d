use actix_web::{HttpResponse, Responder, web};
use hrm_workflow::Workflow;
use hrm_workflow::service::Efficiency;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::auth::auth::AuthUser;

#[derive(Deserialize, ToSchema)]
pub struct EfficiencyInput {
    #[schema(example = "30", value_type = String)]
    pub estimated_hours: Decimal,
    #[schema(example = "16", value_type = String)]
    pub actual_hours: Decimal,
}

/// Estimated-vs-actual efficiency with the configured display ceiling applied
#[utoipa::path(
    post,
    path = "/api/performance/efficiency",
    request_body = EfficiencyInput,
    responses(
        (status = 200, description = "Raw and display percentages", body = Efficiency, example = json!({
            "percent": "187.5",
            "display_percent": "150"
        })),
        (status = 400, description = "Negative hours"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Performance"
)]
pub async fn efficiency(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    body: web::Json<EfficiencyInput>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let result = workflow
        .efficiency(body.estimated_hours, body.actual_hours)
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(result))
}
