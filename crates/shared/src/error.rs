use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const QUESTION_FETCH_FAILED_MESSAGE: &str = "Failed to fetch question";
pub const SUMMARY_FETCH_FAILED_MESSAGE: &str = "Failed to fetch summary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DirectoryUnreachable,
    EmployeeNotFound,
    QuestionFetchFailed,
    SummaryFetchFailed,
    SubmissionFailed,
    PersistenceFailed,
}

/// The single user-facing error slot of a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Unable to reach backend")]
    DirectoryUnreachable,
    #[error("Employee ID not found")]
    EmployeeNotFound,
    #[error("{}", .detail.as_deref().unwrap_or(QUESTION_FETCH_FAILED_MESSAGE))]
    QuestionFetchFailed { detail: Option<String> },
    #[error("{}", .detail.as_deref().unwrap_or(SUMMARY_FETCH_FAILED_MESSAGE))]
    SummaryFetchFailed { detail: Option<String> },
    #[error("Failed to submit answer")]
    SubmissionFailed,
    #[error("Failed to record answer")]
    PersistenceFailed,
}

impl SessionError {
    pub fn question_fetch_failed(detail: Option<String>) -> Self {
        Self::QuestionFetchFailed {
            detail: non_blank(detail),
        }
    }

    pub fn summary_fetch_failed(detail: Option<String>) -> Self {
        Self::SummaryFetchFailed {
            detail: non_blank(detail),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DirectoryUnreachable => ErrorKind::DirectoryUnreachable,
            Self::EmployeeNotFound => ErrorKind::EmployeeNotFound,
            Self::QuestionFetchFailed { .. } => ErrorKind::QuestionFetchFailed,
            Self::SummaryFetchFailed { .. } => ErrorKind::SummaryFetchFailed,
            Self::SubmissionFailed => ErrorKind::SubmissionFailed,
            Self::PersistenceFailed => ErrorKind::PersistenceFailed,
        }
    }

    /// Whether the operator can fix this by editing the identifier.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::EmployeeNotFound)
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

fn non_blank(detail: Option<String>) -> Option<String> {
    detail
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
