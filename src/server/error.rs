//! HTTP error responses.
//!
//! Every handler returns `Result<T, ApiError>`. Provider and storage
//! failures are logged in full by the layers below; the caller only sees
//! fixed, student-facing copy plus the resolved session id so the
//! conversation can continue on the next attempt.

use crate::error::{categorize, ErrorCategory};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

/// Failure returned by an API handler
#[derive(Debug)]
pub struct ApiError {
    kind: ApiErrorKind,
    detail: String,
    session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiErrorKind {
    Unauthorized,
    Category(ErrorCategory),
}

impl ApiError {
    /// Missing or empty `X-User-Id` header
    pub fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            detail: "missing X-User-Id header".to_string(),
            session_id: None,
        }
    }

    /// Attach the session the failed request was resolved to
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorKind::Category(category) => match category {
                ErrorCategory::ConfigurationMissing => StatusCode::SERVICE_UNAVAILABLE,
                ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ErrorCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ErrorCategory::UpstreamRejected | ErrorCategory::MalformedResponse => {
                    StatusCode::BAD_GATEWAY
                }
                ErrorCategory::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorCategory::SessionNotFound => StatusCode::NOT_FOUND,
                ErrorCategory::Storage | ErrorCategory::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// (error, consultation reply) copy shown to the student
    fn copy(&self) -> (String, Option<&'static str>) {
        let category = match self.kind {
            ApiErrorKind::Unauthorized => return (self.detail.clone(), None),
            ApiErrorKind::Category(category) => category,
        };

        match category {
            ErrorCategory::InvalidInput => (self.detail.clone(), None),
            ErrorCategory::SessionNotFound => ("Session not found".to_string(), None),
            ErrorCategory::ConfigurationMissing => (
                "LLM service is not configured. Please contact the administrator.".to_string(),
                Some("I'm sorry, but the consultation service is currently unavailable. Please contact your campus mental health services directly for support."),
            ),
            ErrorCategory::Timeout => (
                "The consultation service took too long to respond.".to_string(),
                Some("I'm sorry, that took longer than expected. Please try again, perhaps with a shorter message."),
            ),
            ErrorCategory::RateLimited => (
                "The consultation service is receiving too many requests.".to_string(),
                Some("A lot of students are reaching out right now. Please wait a moment and try again."),
            ),
            ErrorCategory::UpstreamRejected | ErrorCategory::MalformedResponse => (
                "Failed to get a response from the consultation service.".to_string(),
                Some("I'm sorry, I'm having trouble responding right now. Please try again in a moment."),
            ),
            ErrorCategory::Storage | ErrorCategory::Internal => (
                "Failed to process consultation.".to_string(),
                Some("I'm sorry, something went wrong on our side. Please try again, or contact your campus mental health services if you need support now."),
            ),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            kind: ApiErrorKind::Category(categorize(&err)),
            detail: err.to_string(),
            session_id: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, "Consultation request failed: {}", self.detail);
        }

        let (error, reply) = self.copy();
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(error));
        if let Some(session_id) = self.session_id {
            body.insert("session_id".to_string(), Value::String(session_id));
        }
        if let Some(reply) = reply {
            body.insert("consultation".to_string(), json!({ "response": reply }));
        }

        (status, Json(Value::Object(body))).into_response()
    }
}
