use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};
use hrm_workflow::model::{Employee, Principal};

/// Authenticated caller, placed in request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(ErrorUnauthorized("Missing token"))),
        }
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.principal.is_admin() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.principal.is_approver() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// The employee record this user acts as.
    pub fn employee(&self) -> actix_web::Result<Employee> {
        self.principal
            .employee_id
            .map(|id| Employee::new(id, self.principal.department_id))
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))
    }

    /// HR/Admin may act on anyone; others only on their own employee record.
    pub fn require_self_or_approver(&self, employee_id: u64) -> actix_web::Result<()> {
        if self.principal.is_approver() || self.principal.acts_for(employee_id) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Access denied"))
        }
    }
}
