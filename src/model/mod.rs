pub mod attendance;
pub mod employee;
pub mod payroll;
pub mod request;
pub mod role;

pub use attendance::{AttendanceEntry, AttendanceKey, AttendanceStatus, ImportRow};
pub use employee::{DateRange, Employee};
pub use payroll::{Adjustment, AdjustmentKind, BreakdownLine, NetPay, PayPeriod, PayrollLine};
pub use request::{
    AttendanceCorrectionPayload, Decision, LeavePayload, LeaveType, ListScope,
    ProjectAssignmentPayload, RequestKind, RequestPayload, RequestRecord, RequestStatus,
};
pub use role::{Principal, Role};
