use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::clients::ClientError;
use crate::domain::order::OrderError;
use crate::query::PageRequestError;

// ============================================================================
// HTTP Error Mapping
// ============================================================================
//
// Every failure is rendered as a problem document:
//   {"type", "title", "status", "detail", "instance"}
// with content type application/problem+json.
//
// ============================================================================

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

#[derive(Debug, thiserror::Error)]
pub enum ApiErrorKind {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Paging(#[from] PageRequestError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

/// Error returned by handlers: what went wrong plus the request path it concerns
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub instance: String,
}

impl ApiError {
    pub fn new(kind: impl Into<ApiErrorKind>, instance: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            instance: instance.into(),
        }
    }

    fn title(&self) -> &'static str {
        match &self.kind {
            ApiErrorKind::Order(error) => match error {
                OrderError::NoSuchOrder(_) => "No such order",
                OrderError::NoSuchService(_) => "No such service",
                OrderError::NoSuchStatus(_) => "No such order status",
                OrderError::IllegalTransition { .. } => "Illegal order status",
                OrderError::OrderFinalized { .. } => "Order finalized",
                OrderError::ConcurrencyConflict { .. } => "Concurrent modification",
                OrderError::Collaborator(e) if e.is_timeout() => "Collaborator timeout",
                OrderError::Collaborator(_) => "Collaborator unavailable",
                OrderError::Storage(_) => "Storage failure",
            },
            ApiErrorKind::Paging(_) | ApiErrorKind::BadRequest(_) => "Bad request",
            ApiErrorKind::NotFound(_) => "Not found",
        }
    }

    fn detail(&self) -> String {
        match &self.kind {
            // Driver messages stay in the logs
            ApiErrorKind::Order(OrderError::Storage(_)) => "Internal storage error".to_string(),
            ApiErrorKind::Order(OrderError::Collaborator(ClientError::Http(_))) => {
                "A dependent service could not be reached".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn problem(&self) -> Problem {
        Problem {
            problem_type: "about:blank".to_string(),
            title: self.title().to_string(),
            status: self.status_code().as_u16(),
            detail: self.detail(),
            instance: self.instance.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.kind {
            ApiErrorKind::Order(error) => match error {
                OrderError::NoSuchOrder(_) | OrderError::NoSuchService(_) | OrderError::NoSuchStatus(_) => {
                    StatusCode::NOT_FOUND
                }
                OrderError::IllegalTransition { .. } | OrderError::OrderFinalized { .. } => StatusCode::BAD_REQUEST,
                OrderError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
                OrderError::Collaborator(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
                OrderError::Collaborator(_) => StatusCode::SERVICE_UNAVAILABLE,
                OrderError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiErrorKind::Paging(_) | ApiErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(instance = %self.instance, error = %self.kind, "Request failed");
        } else {
            tracing::debug!(instance = %self.instance, error = %self.kind, "Request rejected");
        }

        let mut response = HttpResponse::build(status);
        response.insert_header((header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE));
        if let ApiErrorKind::Order(error) = &self.kind {
            if error.is_retryable() {
                response.insert_header((header::RETRY_AFTER, "1"));
            }
        }
        response.json(self.problem())
    }
}
