//! Request and response bodies of the check-in service HTTP contract.

use serde::{Deserialize, Serialize};

use crate::domain::EmployeeId;

pub const GET_EMPLOYEES_PATH: &str = "/get-employees";
pub const GET_QUESTION_PATH: &str = "/get-question";
pub const GET_FEEDBACK_PATH: &str = "/get-feedback";
pub const WRITE_SUMMARY_PATH: &str = "/write-summary";
pub const GET_SUMMARY_PATH: &str = "/get-summary";

/// Body shared by `/get-question` and `/get-summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRequest {
    pub employee_id: EmployeeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub employee_id: EmployeeId,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummaryRequest {
    pub employee_id: EmployeeId,
    pub question: String,
    pub answer: String,
}

impl From<&FeedbackRequest> for WriteSummaryRequest {
    fn from(value: &FeedbackRequest) -> Self {
        Self {
            employee_id: value.employee_id.clone(),
            question: value.question.clone(),
            answer: value.answer.clone(),
        }
    }
}

/// `{ "text": ... }` as returned by the feedback and summary endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResponse {
    #[serde(default)]
    pub text: String,
}
