use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_access_token;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::{Value, json};
use tracing::debug;

fn bearer_token(req: &ServiceRequest) -> Result<String, &'static str> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Invalid Authorization header encoding")?;

    header
        .strip_prefix("Bearer ")
        .map(str::to_owned)
        .ok_or("Authorization header must start with Bearer")
}

fn reject(req: ServiceRequest, body: Value) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(body);
    req.into_response(resp.map_into_boxed_body())
}

/// Resolves the bearer token into an `AuthUser` for the handlers behind it.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = req
        .app_data::<Data<Config>>()
        .map(|config| config.jwt_secret.clone())
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let token = match bearer_token(&req) {
        Ok(token) => token,
        Err(message) => return Ok(reject(req, json!({ "error": message }))),
    };

    let claims = match verify_access_token(&token, &secret) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, path = req.path(), "Rejected bearer token");
            return Ok(reject(
                req,
                json!({"error": "Invalid or expired token", "details": e}),
            ));
        }
    };

    let Some(principal) = claims.into_principal() else {
        return Ok(reject(req, json!({"error": "Invalid role"})));
    };

    req.extensions_mut().insert(AuthUser { principal });
    next.call(req).await
}
