//! Health check and face model endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;
use super::error::ApiError;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "kyc-onboard"
    }))
}

/// GET /api/models/status
pub async fn model_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.models.status().await)
}

/// GET /models/{file} serves one model file to the browser.
pub async fn model_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .models
        .file_path(&file)
        .ok_or_else(|| ApiError::not_found("Unknown model file"))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Model file not downloaded"));
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read model file");
            return Err(ApiError::internal("Failed to read model file"));
        }
    };

    let content_type = if file.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
