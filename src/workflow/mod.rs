pub mod attendance_ledger;
pub mod efficiency;
pub mod payroll_computation;
pub mod request_lifecycle;

pub use attendance_ledger::{
    AttendanceLedger, AttendanceSummary, ImportReport, RejectedRow, format_work_minutes,
};
pub use efficiency::{DisplayPolicy, efficiency_percent};
pub use payroll_computation::{PayrollRun, PeriodAnalytics, Payslip, compute_net, run_payroll};
pub use request_lifecycle::RequestLifecycle;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// State is only written after every check has passed, so a poisoned guard
// still holds consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
