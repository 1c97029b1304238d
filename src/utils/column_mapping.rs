use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{AttendanceStatus, ImportRow};

pub const SUPPORTED_MAPPING_VERSION: u32 = 1;

/// One spreadsheet row as delivered by an import source: header -> cell.
pub type RawRow = Map<String, Value>;

/// Caller-supplied mapping from sheet headers to import fields.
/// Headers are matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "version": 1,
    "employee_id": "Employee_ID",
    "date": "Date",
    "check_in": "In",
    "check_out": "Out",
    "status": "Status",
    "date_format": "%Y-%m-%d",
    "time_format": "%H:%M:%S"
}))]
pub struct ColumnMapping {
    pub version: u32,
    pub employee_id: String,
    pub date: String,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_time_format() -> String {
    "%H:%M:%S".to_string()
}

impl ColumnMapping {
    pub fn new(employee_id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            version: SUPPORTED_MAPPING_VERSION,
            employee_id: employee_id.into(),
            date: date.into(),
            check_in: None,
            check_out: None,
            status: None,
            date_format: default_date_format(),
            time_format: default_time_format(),
        }
    }

    pub fn with_times(mut self, check_in: impl Into<String>, check_out: impl Into<String>) -> Self {
        self.check_in = Some(check_in.into());
        self.check_out = Some(check_out.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn validate(&self) -> WorkflowResult<()> {
        if self.version != SUPPORTED_MAPPING_VERSION {
            return Err(WorkflowError::validation(format!(
                "unsupported column mapping version {} (expected {SUPPORTED_MAPPING_VERSION})",
                self.version
            )));
        }
        if self.employee_id.trim().is_empty() || self.date.trim().is_empty() {
            return Err(WorkflowError::validation(
                "employee_id and date columns must be named",
            ));
        }
        Ok(())
    }

    pub fn map_row(&self, raw: &RawRow) -> WorkflowResult<ImportRow> {
        let employee_id = match required(raw, &self.employee_id)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
        .ok_or_else(|| invalid_cell(&self.employee_id, "an employee id"))?;

        let date = match required(raw, &self.date)? {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), &self.date_format).ok(),
            _ => None,
        }
        .ok_or_else(|| invalid_cell(&self.date, "a date"))?;

        let check_in = self.time_cell(raw, self.check_in.as_deref())?;
        let check_out = self.time_cell(raw, self.check_out.as_deref())?;

        let status = match optional_text(raw, self.status.as_deref())? {
            Some((column, text)) => Some(
                AttendanceStatus::from_str(text)
                    .map_err(|_| invalid_cell(column, "an attendance status"))?,
            ),
            None => None,
        };

        Ok(ImportRow {
            employee_id,
            date,
            check_in,
            check_out,
            status,
        })
    }

    fn time_cell(&self, raw: &RawRow, column: Option<&str>) -> WorkflowResult<Option<NaiveTime>> {
        match optional_text(raw, column)? {
            Some((column, text)) => NaiveTime::parse_from_str(text, &self.time_format)
                .map(Some)
                .map_err(|_| invalid_cell(column, "a time of day")),
            None => Ok(None),
        }
    }
}

fn required<'a>(raw: &'a RawRow, column: &str) -> WorkflowResult<&'a Value> {
    match raw.get(column) {
        Some(Value::Null) | None => Err(WorkflowError::validation(format!(
            "missing column '{column}'"
        ))),
        Some(value) => Ok(value),
    }
}

/// Blank, null or absent optional cells read as `None`; any other non-text
/// cell is rejected rather than dropped.
fn optional_text<'a, 'c>(
    raw: &'a RawRow,
    column: Option<&'c str>,
) -> WorkflowResult<Option<(&'c str, &'a str)>> {
    let Some(column) = column else {
        return Ok(None);
    };
    match raw.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some((column, s.trim()))),
        Some(_) => Err(invalid_cell(column, "text")),
    }
}

fn invalid_cell(column: &str, expected: &str) -> WorkflowError {
    WorkflowError::validation(format!("column '{column}' does not hold {expected}"))
}
