//! Error types for the KYC onboarding service.

use crate::face::FaceSide;
use crate::onboarding::state::Step;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from image preprocessing and text recognition.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Failed to launch {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("OCR output was not valid UTF-8")]
    InvalidOutput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from face embedding and the model store.
#[derive(Debug, thiserror::Error)]
pub enum FaceError {
    #[error("Face embedding service is not configured")]
    ServiceNotConfigured,

    #[error("Face embedding request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response from face embedding service: {0}")]
    InvalidResponse(String),

    #[error("Descriptor dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Face models not ready, missing: {}", missing.join(", "))]
    ModelsNotReady { missing: Vec<String> },

    #[error("Failed to download {file}: {reason}")]
    Download { file: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from OTP issuance and verification.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Phone number must be exactly 10 digits")]
    InvalidPhoneNumber,

    #[error("OTP must be exactly 6 digits")]
    InvalidCodeFormat,

    #[error("No OTP has been requested for {phone_number}")]
    NoSession { phone_number: String },

    #[error("Invalid OTP")]
    CodeMismatch,

    #[error("OTP expired")]
    Expired,

    #[error("SMS dispatch failed: {0}")]
    Dispatch(String),
}

/// Failure of a single verification step attempt.
///
/// Every variant is user-visible and retryable; nothing is retried
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Missing input: {0}")]
    InputMissing(String),

    #[error("Invalid {field}: {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error("No face detected in the {0}")]
    DetectionFailed(FaceSide),

    #[error("{service} failed: {reason}")]
    ExternalServiceFailure { service: String, reason: String },

    #[error("The live face does not match the PAN card photo (distance {distance:.3})")]
    NoMatch { distance: f32 },
}

impl StepError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn external(service: &str, reason: impl std::fmt::Display) -> Self {
        Self::ExternalServiceFailure {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<OcrError> for StepError {
    fn from(e: OcrError) -> Self {
        Self::external("ocr", e)
    }
}

impl From<FaceError> for StepError {
    fn from(e: FaceError) -> Self {
        Self::external("face embedding", e)
    }
}

impl From<OtpError> for StepError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::InvalidPhoneNumber => Self::validation("phone number", e.to_string()),
            OtpError::Dispatch(_) => Self::external("sms", e),
            other => Self::validation("otp", other.to_string()),
        }
    }
}

/// Errors raised by the onboarding orchestrator itself.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Step {attempted} is not active (current step: {active})")]
    WrongStep { active: Step, attempted: Step },

    #[error("Face verification requires a PAN card image")]
    MissingReferenceImage,

    #[error(transparent)]
    Step(#[from] StepError),
}
