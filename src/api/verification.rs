//! Stateless verification endpoints: PAN reading and phone OTP.

use axum::Json;
use axum::extract::State;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::AppState;
use super::form::UploadForm;
use crate::error::OtpError;

/// Multipart field carrying the card image.
pub const PAN_IMAGE_FIELD: &str = "panImage";

// ── PAN ─────────────────────────────────────────────────────────────────

/// POST /api/process-pan
///
/// Reads the PAN off an uploaded card. A card with no readable PAN is still
/// a 200 with `panNumber: null`; the client falls back to manual entry.
pub async fn process_pan(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let form = match multipart {
        Ok(multipart) => UploadForm::read(multipart)
            .await
            .map_err(|e| e.body_text()),
        Err(e) => Err(e.body_text()),
    };
    let form = match form {
        Ok(form) => form,
        Err(details) => {
            warn!(error = %details, "Rejected PAN upload");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "No file uploaded", "details": details})),
            )
                .into_response();
        }
    };
    let Some(part) = form.file(PAN_IMAGE_FIELD) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No file uploaded"})),
        )
            .into_response();
    };

    let image = match state.uploads.save(Some(&part.file_name), &part.bytes).await {
        Ok(image) => image,
        Err(e) => return pan_failure(&e.to_string()),
    };

    match state.reader.read(&image).await {
        Ok(readout) => {
            info!(
                image = image.file_name(),
                found = readout.pan_number.is_some(),
                "PAN card processed"
            );
            Json(json!({
                "success": true,
                "panNumber": readout.pan_number,
                "fullText": readout.full_text,
            }))
            .into_response()
        }
        Err(e) => pan_failure(&e.to_string()),
    }
}

fn pan_failure(details: &str) -> Response {
    error!(error = details, "Error processing PAN card");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Error processing PAN card",
            "details": details,
        })),
    )
        .into_response()
}

// ── Phone ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyPhoneRequest {
    pub phone_number: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub otp: String,
}

fn outcome(status: StatusCode, success: bool, message: &str) -> Response {
    (status, Json(json!({"success": success, "message": message}))).into_response()
}

/// POST /api/verify-phone
pub async fn verify_phone(
    State(state): State<AppState>,
    Json(body): Json<VerifyPhoneRequest>,
) -> Response {
    match state.otp.send_otp(&body.phone_number).await {
        Ok(_) => outcome(StatusCode::OK, true, "OTP sent successfully"),
        Err(e @ OtpError::Dispatch(_)) => {
            warn!(error = %e, "OTP dispatch failed");
            outcome(StatusCode::BAD_GATEWAY, false, &e.to_string())
        }
        Err(e) => outcome(StatusCode::BAD_REQUEST, false, &e.to_string()),
    }
}

/// POST /api/verify-otp
///
/// A wrong or unrequested code is a normal `success: false` answer; only
/// malformed input is a 400.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Response {
    match state.otp.verify_otp(&body.phone_number, &body.otp).await {
        Ok(_) => outcome(StatusCode::OK, true, "OTP verified successfully"),
        Err(e @ (OtpError::InvalidPhoneNumber | OtpError::InvalidCodeFormat)) => {
            outcome(StatusCode::BAD_REQUEST, false, &e.to_string())
        }
        Err(OtpError::Expired) => outcome(StatusCode::OK, false, "OTP expired"),
        Err(_) => outcome(StatusCode::OK, false, "Invalid OTP"),
    }
}
