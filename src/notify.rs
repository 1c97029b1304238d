use serde::Serialize;
use serde_json::Value;
use strum_macros::Display;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RequestSubmitted,
    RequestApproved,
    RequestRejected,
    CheckedIn,
    CheckedOut,
    AttendanceOverridden,
    AttendanceImported,
    PayslipIssued,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationEvent {
    pub event_type: EventType,
    pub subject_employee_id: u64,
    pub details: Value,
}

/// Fire-and-forget sink for state-transition events. Implementations must not
/// fail the caller; delivery problems are theirs to log.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent);
}

/// Writes every event to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: NotificationEvent) {
        info!(
            event = %event.event_type,
            employee_id = event.subject_employee_id,
            details = %event.details,
            "Notification"
        );
    }
}
