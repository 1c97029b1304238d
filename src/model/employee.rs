use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{WorkflowError, WorkflowResult};

/// The subject of requests, attendance entries and payroll lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "id": 1000, "department_id": 10 }))]
pub struct Employee {
    #[schema(example = 1000)]
    pub id: u64,

    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,
}

impl Employee {
    pub fn new(id: u64, department_id: Option<u64>) -> Self {
        Self { id, department_id }
    }
}

/// Inclusive calendar-date range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    start: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = WorkflowError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> WorkflowResult<Self> {
        if start > end {
            return Err(WorkflowError::validation(format!(
                "start date {start} cannot be after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}
