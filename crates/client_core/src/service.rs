use std::time::Duration;

use async_trait::async_trait;
use checkin_shared::{
    domain::{Employee, EmployeeId, Question},
    protocol::{
        EmployeeRequest, FeedbackRequest, TextResponse, WriteSummaryRequest, GET_EMPLOYEES_PATH,
        GET_FEEDBACK_PATH, GET_QUESTION_PATH, GET_SUMMARY_PATH, WRITE_SUMMARY_PATH,
    },
};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::ServiceError;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote collaborator of the session controller.
#[async_trait]
pub trait CheckinService: Send + Sync {
    async fn list_employees(&self) -> Result<Vec<Employee>, ServiceError>;
    async fn get_question(&self, employee_id: &EmployeeId) -> Result<Question, ServiceError>;
    /// `Ok(None)` when the grading endpoint answered 2xx without feedback text.
    async fn get_feedback(&self, request: &FeedbackRequest)
        -> Result<Option<String>, ServiceError>;
    async fn write_summary(&self, request: &WriteSummaryRequest) -> Result<(), ServiceError>;
    async fn get_summary(&self, employee_id: &EmployeeId) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub server_url: String,
    pub request_timeout: Duration,
    pub feedback_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            feedback_path: GET_FEEDBACK_PATH.into(),
        }
    }
}

pub struct HttpCheckinService {
    http: Client,
    server_url: String,
    feedback_path: String,
}

impl HttpCheckinService {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let server_url = validate_server_url(&config.server_url)?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ServiceError::transport("client", err))?;
        let feedback_path = if config.feedback_path.starts_with('/') {
            config.feedback_path
        } else {
            format!("/{}", config.feedback_path)
        };

        Ok(Self {
            http,
            server_url,
            feedback_path,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, ServiceError> {
        debug!(endpoint = path, "checkin: POST");
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|err| ServiceError::transport(path, err))?;
        ensure_success(path, response).await
    }

    async fn get(&self, path: &str) -> Result<Response, ServiceError> {
        debug!(endpoint = path, "checkin: GET");
        let response = self
            .http
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(|err| ServiceError::transport(path, err))?;
        ensure_success(path, response).await
    }
}

#[async_trait]
impl CheckinService for HttpCheckinService {
    async fn list_employees(&self) -> Result<Vec<Employee>, ServiceError> {
        let response = self.get(GET_EMPLOYEES_PATH).await?;
        decode_json(GET_EMPLOYEES_PATH, response).await
    }

    async fn get_question(&self, employee_id: &EmployeeId) -> Result<Question, ServiceError> {
        let request = EmployeeRequest {
            employee_id: employee_id.clone(),
        };
        let response = self.post_json(GET_QUESTION_PATH, &request).await?;
        decode_json(GET_QUESTION_PATH, response).await
    }

    async fn get_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<Option<String>, ServiceError> {
        let path = self.feedback_path.as_str();
        let response = self.post_json(path, request).await?;
        let body = response
            .text()
            .await
            .map_err(|err| ServiceError::transport(path, err))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let feedback: TextResponse =
            serde_json::from_str(&body).map_err(|err| ServiceError::decode(path, err))?;
        Ok(Some(feedback.text).filter(|text| !text.trim().is_empty()))
    }

    async fn write_summary(&self, request: &WriteSummaryRequest) -> Result<(), ServiceError> {
        self.post_json(WRITE_SUMMARY_PATH, request).await?;
        Ok(())
    }

    async fn get_summary(&self, employee_id: &EmployeeId) -> Result<String, ServiceError> {
        let request = EmployeeRequest {
            employee_id: employee_id.clone(),
        };
        let response = self.post_json(GET_SUMMARY_PATH, &request).await?;
        let summary: TextResponse = decode_json(GET_SUMMARY_PATH, response).await?;
        Ok(summary.text)
    }
}

fn validate_server_url(raw: &str) -> Result<String, ServiceError> {
    let invalid = |reason: String| ServiceError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed".into()));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

async fn ensure_success(endpoint: &str, response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(endpoint, status = status.as_u16(), "checkin: request rejected");
    Err(ServiceError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn decode_json<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, ServiceError> {
    response
        .json()
        .await
        .map_err(|err| ServiceError::decode(endpoint, err))
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
