//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{OrchestratorError, StepError};

/// An error rendered as `{"success": false, "error": ..., "kind": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "success": false,
                "error": self.message,
                "kind": self.kind,
            })),
        )
            .into_response()
    }
}

impl From<StepError> for ApiError {
    fn from(e: StepError) -> Self {
        let (status, kind) = match &e {
            StepError::InputMissing(_) => (StatusCode::BAD_REQUEST, "input_missing"),
            StepError::ValidationFailed { .. } => (StatusCode::BAD_REQUEST, "validation_failed"),
            StepError::DetectionFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "detection_failed"),
            StepError::NoMatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "no_match"),
            StepError::ExternalServiceFailure { .. } => {
                (StatusCode::BAD_GATEWAY, "external_service_failure")
            }
        };
        Self::new(status, kind, e.to_string())
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::WrongStep { .. } => {
                Self::new(StatusCode::CONFLICT, "wrong_step", e.to_string())
            }
            OrchestratorError::MissingReferenceImage => {
                Self::new(StatusCode::CONFLICT, "missing_reference_image", e.to_string())
            }
            OrchestratorError::Step(e) => e.into(),
        }
    }
}
