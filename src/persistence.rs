use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{AttendanceEntry, AttendanceKey, PayPeriod, PayrollLine, RequestRecord};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend failed: {0}")]
    Backend(String),

    #[error("stored record could not be decoded: {0}")]
    Codec(#[from] serde_json::Error),

    /// The store already holds a newer version of the record.
    #[error("stored record changed concurrently: {0}")]
    Conflict(String),
}

/// Natural key of each persisted record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Request(Uuid),
    Attendance(AttendanceKey),
    Payroll { employee_id: u64, period: PayPeriod },
}

impl RecordKey {
    pub fn attendance(employee_id: u64, date: NaiveDate) -> Self {
        RecordKey::Attendance(AttendanceKey::new(employee_id, date))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Request(RequestRecord),
    Attendance(AttendanceEntry),
    Payroll(PayrollLine),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Request(r) => RecordKey::Request(r.id),
            Record::Attendance(e) => RecordKey::Attendance(e.key()),
            Record::Payroll(l) => RecordKey::Payroll {
                employee_id: l.employee_id,
                period: l.period,
            },
        }
    }
}

/// Source-of-truth storage owned by the caller.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn load(&self, key: &RecordKey) -> Result<Option<Record>, PersistenceError>;

    async fn save(&self, record: &Record) -> Result<(), PersistenceError>;
}

/// Process-local store; used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<RecordKey, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn load(&self, key: &RecordKey) -> Result<Option<Record>, PersistenceError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    async fn save(&self, record: &Record) -> Result<(), PersistenceError> {
        // a single insert, so a poisoned map is still whole
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.key(), record.clone());
        Ok(())
    }
}
