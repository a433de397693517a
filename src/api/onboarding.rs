//! Session-scoped onboarding endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use super::form::{FilePart, UploadForm};
use super::verification::PAN_IMAGE_FIELD;
use crate::error::{OrchestratorError, StepError};
use crate::onboarding::{FaceInput, OnboardingSession, PanInput, PhoneInput, Step};
use crate::uploads::ImageRef;

/// Multipart field carrying the webcam capture.
pub const CAPTURE_FIELD: &str = "capture";
/// Multipart field carrying a manually entered PAN.
pub const PAN_NUMBER_FIELD: &str = "panNumber";

type SessionHandle = Arc<Mutex<OnboardingSession>>;

async fn find_session(state: &AppState, id: &str) -> Result<SessionHandle, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| ApiError::bad_request("Invalid session ID"))?;
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::not_found("Session not found"))
}

/// Refuse early when `step` is not active, before any upload is stored.
fn ensure_step(session: &OnboardingSession, step: Step) -> Result<(), ApiError> {
    let active = session.current_step();
    if active == step {
        Ok(())
    } else {
        Err(OrchestratorError::WrongStep {
            active,
            attempted: step,
        }
        .into())
    }
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;
    UploadForm::read(multipart)
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

async fn store(state: &AppState, part: &FilePart) -> Result<ImageRef, ApiError> {
    state
        .uploads
        .save(Some(&part.file_name), &part.bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store upload: {e}")))
}

async fn status_response(state: &AppState, session: &OnboardingSession) -> Response {
    let models_ready = state.models.status().await.ready;
    Json(session.status(models_ready)).into_response()
}

/// POST /api/onboarding
pub async fn create_session(State(state): State<AppState>) -> Response {
    let handle = state.sessions.create().await;
    let session = handle.lock().await;
    let models_ready = state.models.status().await.ready;
    (StatusCode::CREATED, Json(session.status(models_ready))).into_response()
}

/// GET /api/onboarding/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let handle = find_session(&state, &id).await?;
    let session = handle.lock().await;
    Ok(status_response(&state, &session).await)
}

/// DELETE /api/onboarding/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::bad_request("Invalid session ID"))?;
    if state.sessions.remove(id).await {
        Ok(Json(json!({"status": "deleted"})).into_response())
    } else {
        Err(ApiError::not_found("Session not found"))
    }
}

/// POST /api/onboarding/{id}/pan
///
/// Multipart with a `panImage` file, a `panNumber` text field, or both. A
/// typed number wins over OCR; the image is still kept for the face step.
pub async fn submit_pan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    ensure_step(&session, Step::Pan)?;

    let form = read_form(multipart).await?;
    let image = match form.file(PAN_IMAGE_FIELD) {
        Some(part) => Some(store(&state, part).await?),
        None => None,
    };
    let input = match (form.text(PAN_NUMBER_FIELD), image) {
        (Some(pan_number), image) => PanInput::Manual {
            pan_number: pan_number.to_string(),
            image,
        },
        (None, Some(image)) => PanInput::Scanned(image),
        (None, None) => {
            return Err(StepError::InputMissing("PAN card image or PAN number".to_string()).into());
        }
    };

    session.submit(state.pan_step.as_ref(), input).await?;
    Ok(status_response(&state, &session).await)
}

/// POST /api/onboarding/{id}/face
pub async fn submit_face(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    ensure_step(&session, Step::Face)?;

    let form = read_form(multipart).await?;
    let part = form
        .file(CAPTURE_FIELD)
        .ok_or_else(|| StepError::InputMissing("webcam capture".to_string()))?;
    let capture = store(&state, part).await?;

    session.submit(state.face_step.as_ref(), FaceInput { capture }).await?;
    Ok(status_response(&state, &session).await)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub phone_number: String,
}

/// POST /api/onboarding/{id}/phone sends a code to the given number.
pub async fn send_otp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SendOtpRequest>,
) -> Result<Response, ApiError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    ensure_step(&session, Step::Phone)?;

    let phone = state
        .otp
        .send_otp(body.phone_number.trim())
        .await
        .map_err(StepError::from)?;
    session.set_pending_phone(phone.clone());
    Ok(Json(json!({
        "success": true,
        "message": "OTP sent successfully",
        "phoneNumber": phone,
    }))
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitOtpRequest {
    pub otp: String,
    /// Defaults to the number the last code was sent to.
    pub phone_number: Option<String>,
}

/// POST /api/onboarding/{id}/otp completes the phone step.
pub async fn submit_otp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitOtpRequest>,
) -> Result<Response, ApiError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    ensure_step(&session, Step::Phone)?;

    let phone_number = body
        .phone_number
        .or_else(|| session.pending_phone().map(|p| p.to_string()))
        .ok_or_else(|| StepError::InputMissing("phone number".to_string()))?;
    let input = PhoneInput {
        phone_number,
        code: body.otp.trim().to_string(),
    };

    session.submit(state.phone_step.as_ref(), input).await?;
    Ok(status_response(&state, &session).await)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub text: String,
}

/// POST /api/onboarding/{id}/chat
pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let handle = find_session(&state, &id).await?;
    let mut session = handle.lock().await;
    if !session.chat(&body.text) {
        return Err(ApiError::bad_request("Message is empty"));
    }
    Ok(Json(json!({"messages": session.transcript().messages()})).into_response())
}
