use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use hrm_workflow::persistence::PersistenceError;
use hrm_workflow::{ServiceError, WorkflowError};
use serde_json::json;

/// HTTP face of a failed workflow call.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError(e)
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        ApiError(e.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(e: PersistenceError) -> Self {
        ApiError(e.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Workflow(e) => match e {
                WorkflowError::Validation(_) | WorkflowError::InvalidTime { .. } => {
                    StatusCode::BAD_REQUEST
                }
                WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
                WorkflowError::DuplicateEntry(_) | WorkflowError::InvalidTransition(_) => {
                    StatusCode::CONFLICT
                }
            },
            ServiceError::Persistence(PersistenceError::Conflict(_)) => StatusCode::CONFLICT,
            ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            ServiceError::Workflow(e) => HttpResponse::build(self.status_code()).json(json!({
                "message": e.to_string(),
                "error": e,
            })),
            ServiceError::Persistence(e @ PersistenceError::Conflict(_)) => {
                HttpResponse::Conflict().json(json!({ "message": e.to_string() }))
            }
            ServiceError::Persistence(_) => HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })),
        }
    }
}
