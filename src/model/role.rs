use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }
}

/// Explicit actor identity passed into every operation that records who acted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
    pub department_id: Option<u64>,
}

impl Principal {
    /// HR and Admin may decide requests and override attendance.
    pub fn is_approver(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hr)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the principal is linked to the given employee record.
    pub fn acts_for(&self, employee_id: u64) -> bool {
        self.employee_id == Some(employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: 7,
            username: "jdoe".into(),
            role,
            employee_id: Some(1000),
            department_id: None,
        }
    }

    #[test]
    fn maps_known_role_ids() {
        assert_eq!(Role::from_id(2), Some(Role::Hr));
        assert_eq!(Role::from_id(9), None);
    }

    #[test]
    fn only_hr_and_admin_approve() {
        assert!(principal(Role::Admin).is_approver());
        assert!(principal(Role::Hr).is_approver());
        assert!(!principal(Role::Employee).is_approver());
        assert!(!principal(Role::ApiUser).is_approver());
    }

    #[test]
    fn acts_for_linked_employee_only() {
        let p = principal(Role::Employee);
        assert!(p.acts_for(1000));
        assert!(!p.acts_for(1001));
    }
}
