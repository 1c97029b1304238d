pub mod attendance;
pub mod error;
pub mod payroll;
pub mod performance;
pub mod requests;
