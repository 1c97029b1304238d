use crate::api::error::ApiError;
use crate::auth::auth::AuthUser;
use actix_web::{HttpResponse, Responder, web};
use hrm_workflow::Workflow;
use hrm_workflow::model::{
    Decision, ListScope, RequestKind, RequestPayload, RequestRecord, RequestStatus,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "kind": "LEAVE",
    "payload": {
        "type": "LEAVE",
        "leave_type": "sick",
        "start_date": "2026-01-05",
        "end_date": "2026-01-06",
        "reason": "flu"
    }
}))]
pub struct SubmitRequest {
    pub kind: RequestKind,
    /// Kind-specific body, tagged with `type`
    #[schema(value_type = Object)]
    pub payload: RequestPayload,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RequestFilter {
    #[schema(example = 1000)]
    /// Filter by subject employee ID
    pub employee_id: Option<u64>,
    #[schema(example = 10)]
    /// Filter by subject department ID
    pub department_id: Option<u64>,
    #[schema(example = "LEAVE")]
    /// Filter by request kind
    pub kind: Option<RequestKind>,
    #[schema(example = "PENDING")]
    /// Filter by status
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    /// Most specific selector picks the scope; employees are always pinned to
    /// themselves and may not ask for anyone else.
    fn scope(&self, auth: &AuthUser) -> actix_web::Result<ListScope> {
        if !auth.principal.is_approver() {
            let own = auth.employee()?.id;
            if self.employee_id.is_some_and(|id| id != own) {
                return Err(actix_web::error::ErrorForbidden(
                    "Employees may only list their own requests",
                ));
            }
            return Ok(ListScope::Employee(own));
        }
        Ok(match (self.employee_id, self.department_id, self.kind) {
            (Some(id), _, _) => ListScope::Employee(id),
            (None, Some(id), _) => ListScope::Department(id),
            (None, None, Some(kind)) => ListScope::Kind(kind),
            (None, None, None) => ListScope::All,
        })
    }

    /// Every given filter applies, whichever one picked the scope.
    fn matches(&self, record: &RequestRecord) -> bool {
        self.employee_id
            .is_none_or(|id| record.subject_employee_id == id)
            && self
                .department_id
                .is_none_or(|id| record.subject_department_id == Some(id))
            && self.kind.is_none_or(|kind| record.kind == kind)
    }
}

/* =========================
Submit request
========================= */
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body(
        content = SubmitRequest,
        description = "Request kind and payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Request submitted", body = RequestRecord),
        (status = 400, description = "Payload failed validation"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn submit_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    body: web::Json<SubmitRequest>,
) -> actix_web::Result<impl Responder> {
    let subject = auth.employee()?;
    let SubmitRequest { kind, payload } = body.into_inner();

    let record = workflow
        .submit_request(&subject, kind, payload)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(record))
}

/* =========================
List requests
========================= */
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestFilter),
    responses(
        (status = 200, description = "Requests in submission order", body = [RequestRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile, or another employee's requests")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn list_requests(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    query: web::Query<RequestFilter>,
) -> actix_web::Result<impl Responder> {
    let scope = query.scope(&auth)?;
    let mut records = workflow.list_requests(scope, query.status);
    records.retain(|r| query.matches(r));

    Ok(HttpResponse::Ok().json(records))
}

/* =========================
Get request
========================= */
#[utoipa::path(
    get,
    path = "/api/requests/{request_id}",
    params(
        ("request_id" = String, Path, description = "Request UUID")
    ),
    responses(
        (status = 200, description = "Request found", body = RequestRecord),
        (status = 403, description = "Not the subject of this request"),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn get_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    let record = workflow
        .get_request(path.into_inner())
        .map_err(ApiError::from)?;
    auth.require_self_or_approver(record.subject_employee_id)?;

    Ok(HttpResponse::Ok().json(record))
}

/* =========================
Approve / reject (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/approve",
    params(
        ("request_id" = String, Path, description = "ID of the request to approve")
    ),
    responses(
        (status = 200, description = "Request approved", body = RequestRecord),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided", body = Object, example = json!({
            "message": "invalid transition: request 3f0c... is already APPROVED"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn approve_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    decide(auth, workflow, path.into_inner(), Decision::Approve).await
}

#[utoipa::path(
    put,
    path = "/api/requests/{request_id}/reject",
    params(
        ("request_id" = String, Path, description = "ID of the request to reject")
    ),
    responses(
        (status = 200, description = "Request rejected", body = RequestRecord),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request already decided")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Requests"
)]
pub async fn reject_request(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    decide(auth, workflow, path.into_inner(), Decision::Reject).await
}

async fn decide(
    auth: AuthUser,
    workflow: web::Data<Workflow>,
    request_id: Uuid,
    decision: Decision,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let record = workflow
        .decide_request(request_id, decision, &auth.principal)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(record))
}
