//! Approval workflow and derived-metric engine behind the HRM console:
//! request lifecycle, attendance ledger and payroll computation.

pub mod error;
pub mod model;
pub mod notify;
pub mod persistence;
pub mod service;
pub mod utils;
pub mod workflow;

pub use error::{WorkflowError, WorkflowResult};
pub use service::{ServiceError, ServiceResult, Workflow};
