use chrono::NaiveTime;
use serde::Serialize;
use thiserror::Error;

/// Tagged failure returned by every workflow operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("check-out {check_out} is earlier than check-in {check_in}")]
    InvalidTime {
        check_in: NaiveTime,
        check_out: NaiveTime,
    },
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        WorkflowError::NotFound(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        WorkflowError::DuplicateEntry(message.into())
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        WorkflowError::InvalidTransition(message.into())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_tag() {
        let err = WorkflowError::not_found("leave request 42");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "NOT_FOUND");
        assert_eq!(json["detail"], "leave request 42");
    }

    #[test]
    fn invalid_time_message_names_both_times() {
        let err = WorkflowError::InvalidTime {
            check_in: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            check_out: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "check-out 08:30:00 is earlier than check-in 09:00:00"
        );
    }
}
