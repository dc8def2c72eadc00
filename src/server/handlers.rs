//! Consultation API handlers.

use crate::server::error::ApiError;
use crate::server::AppState;
use crate::storage::{ConsultationSession, Exchange};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Header carrying the caller identity set by the upstream auth layer
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Body of `POST /api/consultation/message`
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Session to continue; a new one is started when absent or unknown
    #[serde(default)]
    pub session_id: Option<String>,
    /// The student's message
    pub message: String,
}

/// Reply to `POST /api/consultation/message`
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// The recorded exchange
    pub consultation: Exchange,
    /// Session the exchange was recorded in
    pub session_id: String,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "llm_configured": state.service.gateway().is_configured(),
    }))
}

/// `POST /api/consultation/session`
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    user: UserId,
) -> Result<Json<ConsultationSession>, ApiError> {
    let session = state.service.start_session(&user.0).await?;
    Ok(Json(session))
}

/// `POST /api/consultation/message`
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: UserId,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let Json(request) = body.map_err(|e| {
        ApiError::from(anyhow::Error::new(crate::error::CounselError::InvalidInput(
            e.body_text(),
        )))
    })?;

    let service = &state.service;
    service.validate_message(&request.message)?;
    let session = service
        .get_or_create_session(&user.0, request.session_id.as_deref())
        .await?;

    let exchange = service
        .send_in_session(&session, &request.message)
        .await
        .map_err(|e| ApiError::from(e).with_session(session.id.clone()))?;

    Ok(Json(SendMessageResponse {
        session_id: exchange.session_id.clone(),
        consultation: exchange,
    }))
}

/// `GET /api/consultation/session/{session_id}/history`
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    user: UserId,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<Exchange>>, ApiError> {
    let history = state.service.get_history(&user.0, &session_id).await?;
    Ok(Json(history))
}
