use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use hrm_workflow::model::{
    Adjustment, AttendanceStatus, DateRange, Decision, Employee, ImportRow, LeavePayload,
    LeaveType, ListScope, PayPeriod, PayrollLine, Principal, RequestKind, RequestPayload,
    RequestStatus, Role,
};
use hrm_workflow::notify::{EventType, NotificationEvent, Notifier};
use hrm_workflow::persistence::{MemoryStore, Persistence, PersistenceError, Record, RecordKey};
use hrm_workflow::utils::{ColumnMapping, RawRow};
use hrm_workflow::{ServiceError, Workflow, WorkflowError};
use rust_decimal_macros::dec;
use serde_json::json;

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    fn kinds(&self) -> Vec<EventType> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: NotificationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct FailingStore;

#[async_trait]
impl Persistence for FailingStore {
    async fn load(&self, _key: &RecordKey) -> Result<Option<Record>, PersistenceError> {
        Err(PersistenceError::Backend("connection refused".into()))
    }

    async fn save(&self, _record: &Record) -> Result<(), PersistenceError> {
        Err(PersistenceError::Backend("connection refused".into()))
    }
}

/// Memory store that refuses exactly one save, counted from 1.
struct FlakyStore {
    saves: AtomicUsize,
    refuse: AtomicUsize,
    inner: MemoryStore,
}

impl FlakyStore {
    fn refusing(nth: usize) -> Self {
        Self {
            saves: AtomicUsize::new(0),
            refuse: AtomicUsize::new(nth),
            inner: MemoryStore::new(),
        }
    }

    fn refuse_next(&self) {
        let next = self.saves.load(Ordering::SeqCst) + 1;
        self.refuse.store(next, Ordering::SeqCst);
    }
}

#[async_trait]
impl Persistence for FlakyStore {
    async fn load(&self, key: &RecordKey) -> Result<Option<Record>, PersistenceError> {
        self.inner.load(key).await
    }

    async fn save(&self, record: &Record) -> Result<(), PersistenceError> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.refuse.load(Ordering::SeqCst) {
            return Err(PersistenceError::Backend("connection reset".into()));
        }
        self.inner.save(record).await
    }
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn hr() -> Principal {
    Principal {
        user_id: 2,
        username: "hr".into(),
        role: Role::Hr,
        employee_id: None,
        department_id: None,
    }
}

fn leave() -> RequestPayload {
    RequestPayload::Leave(LeavePayload {
        leave_type: LeaveType::Casual,
        start_date: date(5),
        end_date: date(7),
        reason: "family".into(),
    })
}

fn setup() -> (Workflow, Arc<MemoryStore>, Arc<RecordingNotifier>) {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow = Workflow::new(store.clone(), notifier.clone());
    (workflow, store, notifier)
}

#[tokio::test]
async fn first_decision_sticks_and_is_persisted() {
    let (workflow, store, notifier) = setup();
    let subject = Employee::new(100, Some(10));

    let record = workflow
        .submit_request(&subject, RequestKind::Leave, leave())
        .await
        .unwrap();
    let approved = workflow
        .decide_request(record.id, Decision::Approve, &hr())
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.decided_by, Some(2));

    let err = workflow
        .decide_request(record.id, Decision::Reject, &hr())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Workflow(WorkflowError::InvalidTransition(_))
    ));
    assert_eq!(
        workflow.get_request(record.id).unwrap().status,
        RequestStatus::Approved
    );

    let stored = store.load(&RecordKey::Request(record.id)).await.unwrap();
    assert_eq!(stored, Some(Record::Request(approved)));
    assert_eq!(
        notifier.kinds(),
        vec![EventType::RequestSubmitted, EventType::RequestApproved]
    );
}

#[tokio::test]
async fn listing_is_scoped_and_repeatable() {
    let (workflow, _, _) = setup();
    for (id, dept) in [(100, 10), (101, 10), (102, 20)] {
        workflow
            .submit_request(&Employee::new(id, Some(dept)), RequestKind::Leave, leave())
            .await
            .unwrap();
    }

    let dept = workflow.list_requests(ListScope::Department(10), None);
    assert_eq!(dept.len(), 2);
    assert_eq!(dept, workflow.list_requests(ListScope::Department(10), None));
    assert_eq!(
        workflow
            .list_requests(ListScope::All, Some(RequestStatus::Approved))
            .len(),
        0
    );
}

#[tokio::test]
async fn failed_save_surfaces_and_skips_notification() {
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow = Workflow::new(Arc::new(FailingStore), notifier.clone());

    let err = workflow
        .check_in(100, date(5), time(9, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(_)));
    assert!(notifier.kinds().is_empty());
}

#[tokio::test]
async fn retry_after_failed_save_succeeds() {
    let store = Arc::new(FlakyStore::refusing(1));
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow = Workflow::new(store.clone(), notifier.clone());
    let subject = Employee::new(100, Some(10));

    let err = workflow
        .submit_request(&subject, RequestKind::Leave, leave())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(_)));
    assert!(workflow.requests().is_empty());

    let record = workflow
        .submit_request(&subject, RequestKind::Leave, leave())
        .await
        .unwrap();
    assert_eq!(workflow.requests().len(), 1);

    store.refuse_next();
    assert!(workflow
        .decide_request(record.id, Decision::Approve, &hr())
        .await
        .is_err());
    assert_eq!(
        workflow.get_request(record.id).unwrap().status,
        RequestStatus::Pending
    );
    workflow
        .decide_request(record.id, Decision::Approve, &hr())
        .await
        .unwrap();

    store.refuse_next();
    assert!(workflow.check_in(100, date(5), time(9, 0)).await.is_err());
    assert!(workflow.attendance().get(100, date(5)).is_err());
    workflow.check_in(100, date(5), time(9, 0)).await.unwrap();

    store.refuse_next();
    assert!(workflow.check_out(100, date(5), time(17, 0)).await.is_err());
    assert_eq!(workflow.attendance().get(100, date(5)).unwrap().check_out, None);
    let entry = workflow.check_out(100, date(5), time(17, 0)).await.unwrap();
    assert_eq!(entry.work_minutes, 480);

    assert_eq!(
        notifier.kinds(),
        vec![
            EventType::RequestSubmitted,
            EventType::RequestApproved,
            EventType::CheckedIn,
            EventType::CheckedOut
        ]
    );
}

#[tokio::test]
async fn failed_import_save_keeps_only_stored_rows() {
    let store = Arc::new(FlakyStore::refusing(2));
    let workflow = Workflow::new(store.clone(), Arc::new(RecordingNotifier::default()));
    let row = |d: u32| ImportRow {
        employee_id: 100,
        date: date(d),
        check_in: Some(time(9, 0)),
        check_out: Some(time(17, 0)),
        status: None,
    };

    let err = workflow
        .import_attendance(vec![row(5), row(6), row(7)])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(_)));
    assert_eq!(store.inner.len(), 1);
    assert!(workflow.attendance().get(100, date(5)).is_ok());
    assert!(workflow.attendance().get(100, date(6)).is_err());
    assert!(workflow.attendance().get(100, date(7)).is_err());

    let report = workflow
        .import_attendance(vec![row(5), row(6), row(7)])
        .await
        .unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected[0].line, 1);
}

#[tokio::test]
async fn inverted_check_out_leaves_entry_unchanged() {
    let (workflow, _, notifier) = setup();
    workflow.check_in(100, date(5), time(9, 0)).await.unwrap();

    let err = workflow
        .check_out(100, date(5), time(8, 59))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Workflow(WorkflowError::InvalidTime { .. })
    ));
    let entry = workflow.attendance().get(100, date(5)).unwrap();
    assert_eq!(entry.check_out, None);
    assert_eq!(entry.work_minutes, 0);

    let entry = workflow.check_out(100, date(5), time(17, 15)).await.unwrap();
    assert_eq!(entry.work_minutes, 495);
    assert_eq!(
        notifier.kinds(),
        vec![EventType::CheckedIn, EventType::CheckedOut]
    );
}

#[tokio::test]
async fn override_keeps_work_minutes_and_records_actor() {
    let (workflow, _, _) = setup();
    workflow.check_in(100, date(5), time(9, 0)).await.unwrap();
    workflow.check_out(100, date(5), time(10, 0)).await.unwrap();

    let entry = workflow
        .set_attendance_status(100, date(5), AttendanceStatus::Late, &hr())
        .await
        .unwrap();
    assert_eq!(entry.status, AttendanceStatus::Late);
    assert_eq!(entry.work_minutes, 60);
    assert_eq!(entry.status_set_by, Some(2));
}

#[tokio::test]
async fn bulk_import_reports_rejected_rows_only() {
    let (workflow, store, notifier) = setup();
    let row = |d: u32, ci: (u32, u32), co: (u32, u32)| ImportRow {
        employee_id: 100,
        date: date(d),
        check_in: Some(time(ci.0, ci.1)),
        check_out: Some(time(co.0, co.1)),
        status: None,
    };
    let rows = vec![
        row(5, (9, 0), (17, 0)),
        row(6, (9, 0), (17, 0)),
        row(7, (17, 0), (9, 0)),
        row(8, (9, 0), (17, 0)),
        row(9, (9, 0), (17, 0)),
    ];

    let report = workflow.import_attendance(rows).await.unwrap();
    assert_eq!(report.accepted, 4);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].line, 3);
    assert!(matches!(
        report.rejected[0].reason,
        WorkflowError::InvalidTime { .. }
    ));
    assert_eq!(store.len(), 4);
    // one summary event per employee
    assert_eq!(notifier.kinds(), vec![EventType::AttendanceImported]);

    let range = DateRange::new(date(1), date(31)).unwrap();
    let summary = workflow.summarize_attendance(&[100], range);
    assert_eq!(summary.total_entries, 4);
    assert_eq!(summary.total_work_minutes, 4 * 480);
    assert_eq!(summary, workflow.summarize_attendance(&[100], range));
}

#[tokio::test]
async fn sheet_import_separates_unmapped_from_rejected() {
    let (workflow, _, _) = setup();
    workflow.check_in(100, date(5), time(9, 0)).await.unwrap();

    let mapping = ColumnMapping::new("Employee_ID", "Date")
        .with_times("In", "Out")
        .with_status("Status");
    let rows: Vec<RawRow> = [
        json!({"Employee_ID": 100, "Date": "2026-01-05", "In": "09:00:00", "Out": "", "Status": ""}),
        json!({"Employee_ID": "101", "Date": "2026-01-05", "In": "", "Out": "", "Status": "sick"}),
        json!({"Employee_ID": 102, "Date": "05/01/2026", "In": "", "Out": "", "Status": ""}),
    ]
    .into_iter()
    .map(|v| v.as_object().cloned().unwrap())
    .collect();

    let result = workflow.import_sheet(&mapping, rows).await.unwrap();
    assert_eq!(result.report.accepted, 1);
    assert_eq!(result.report.entries[0].status, AttendanceStatus::Sick);
    assert_eq!(result.report.rejected.len(), 1);
    assert!(matches!(
        result.report.rejected[0].reason,
        WorkflowError::DuplicateEntry(_)
    ));
    assert_eq!(result.unmapped.len(), 1);
    assert_eq!(result.unmapped[0].line, 3);
}

#[tokio::test]
async fn payslip_round_trips_through_persistence() {
    let (workflow, _, notifier) = setup();
    let period = PayPeriod::new(2026, 1).unwrap();
    let line = PayrollLine::new(
        100,
        period,
        dec!(1000),
        vec![
            Adjustment::increment_percent(dec!(10)),
            Adjustment::referral_bonus(dec!(500)),
            Adjustment::deduction(dec!(200)),
        ],
    )
    .unwrap();

    let issued = workflow.issue_payslip(line).await.unwrap();
    assert_eq!(issued.pay.net_amount, dec!(1400));

    let loaded = workflow.load_payslip(100, period).await.unwrap();
    assert_eq!(loaded, issued);
    assert_eq!(notifier.kinds(), vec![EventType::PayslipIssued]);

    let missing = workflow.load_payslip(101, period).await.unwrap_err();
    assert!(matches!(
        missing,
        ServiceError::Workflow(WorkflowError::NotFound(_))
    ));
}

#[tokio::test]
async fn payroll_run_rejects_foreign_period() {
    let (workflow, store, _) = setup();
    let january = PayPeriod::new(2026, 1).unwrap();
    let february = PayPeriod::new(2026, 2).unwrap();
    let lines = vec![
        PayrollLine::new(100, january, dec!(1000), vec![]).unwrap(),
        PayrollLine::new(101, february, dec!(2000), vec![]).unwrap(),
    ];

    let err = workflow.run_payroll(january, lines).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Workflow(WorkflowError::Validation(_))
    ));
    assert!(store.is_empty());
}

#[test]
fn efficiency_is_clamped_for_display_only() {
    let (workflow, _, _) = setup();
    let result = workflow.efficiency(dec!(30), dec!(16)).unwrap();
    assert_eq!(result.percent, dec!(187.5));
    assert_eq!(result.display_percent, dec!(150));

    let idle = workflow.efficiency(dec!(8), dec!(0)).unwrap();
    assert_eq!(idle.percent, dec!(0));
}
