use hrm_workflow::model::{Principal, Role};
use serde::{Deserialize, Serialize};

/// JWT payload issued by the identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    #[serde(default)]
    pub department_id: Option<u64>,
}

impl Claims {
    /// The acting identity these claims describe; `None` for an unknown role id.
    pub fn into_principal(self) -> Option<Principal> {
        Some(Principal {
            user_id: self.user_id,
            username: self.sub,
            role: Role::from_id(self.role)?,
            employee_id: self.employee_id,
            department_id: self.department_id,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
