//! The verification steps.
//!
//! A step turns raw input into a [`PartialApplicationData`] by calling its
//! adapter. It may read the application data but never writes it and never
//! advances the wizard; the orchestrator does both.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::model::{ApplicationData, PartialApplicationData};
use super::state::Step;
use crate::error::StepError;
use crate::face::{FaceMatch, FaceMatcher, ModelStore};
use crate::ocr::PanReader;
use crate::otp::OtpService;
use crate::pan::PanNumber;
use crate::uploads::ImageRef;

/// One stage of the wizard.
#[async_trait]
pub trait VerificationStep: Send + Sync {
    /// Raw input the step consumes.
    type Input: Send + 'static;

    /// Which wizard step this implements.
    fn step(&self) -> Step;

    /// Try to complete the step.
    async fn attempt(
        &self,
        data: &ApplicationData,
        input: Self::Input,
    ) -> Result<PartialApplicationData, StepError>;
}

// ── PAN ─────────────────────────────────────────────────────────────────

/// Input to the PAN step.
#[derive(Debug, Clone)]
pub enum PanInput {
    /// Read the number off an uploaded card image.
    Scanned(ImageRef),
    /// Number typed by the user, optionally with the card image for the
    /// face step.
    Manual {
        pan_number: String,
        image: Option<ImageRef>,
    },
}

/// PAN card verification.
pub struct PanStep {
    reader: Arc<PanReader>,
}

impl PanStep {
    pub fn new(reader: Arc<PanReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl VerificationStep for PanStep {
    type Input = PanInput;

    fn step(&self) -> Step {
        Step::Pan
    }

    async fn attempt(
        &self,
        _data: &ApplicationData,
        input: PanInput,
    ) -> Result<PartialApplicationData, StepError> {
        match input {
            PanInput::Scanned(image) => {
                let readout = self.reader.read(&image).await?;
                let pan_number = readout.pan_number.ok_or_else(|| {
                    StepError::validation(
                        "PAN number",
                        "could not extract a PAN number from the image; try again or enter it manually",
                    )
                })?;
                Ok(PartialApplicationData::Pan {
                    pan_number,
                    pan_image: Some(image),
                })
            }
            PanInput::Manual { pan_number, image } => {
                // The entry field upper-cases as the user types; nothing else
                // is corrected.
                let entered = pan_number.trim().to_ascii_uppercase();
                let pan_number = PanNumber::parse(&entered).ok_or_else(|| {
                    StepError::validation("PAN number", "expected 5 letters, 4 digits and a letter")
                })?;
                debug!(has_image = image.is_some(), "Manual PAN accepted");
                Ok(PartialApplicationData::Pan {
                    pan_number,
                    pan_image: image,
                })
            }
        }
    }
}

// ── Face ────────────────────────────────────────────────────────────────

/// Input to the face step: a webcam capture.
#[derive(Debug, Clone)]
pub struct FaceInput {
    pub capture: ImageRef,
}

/// Live face vs PAN card photo.
pub struct FaceStep {
    matcher: Arc<FaceMatcher>,
    models: Arc<ModelStore>,
}

impl FaceStep {
    pub fn new(matcher: Arc<FaceMatcher>, models: Arc<ModelStore>) -> Self {
        Self { matcher, models }
    }
}

#[async_trait]
impl VerificationStep for FaceStep {
    type Input = FaceInput;

    fn step(&self) -> Step {
        Step::Face
    }

    async fn attempt(
        &self,
        data: &ApplicationData,
        input: FaceInput,
    ) -> Result<PartialApplicationData, StepError> {
        self.models.ensure_ready().await?;

        let reference = data
            .pan_image()
            .ok_or_else(|| StepError::InputMissing("PAN card image".to_string()))?;

        match self.matcher.compare(&input.capture, reference).await? {
            FaceMatch::Match { .. } => Ok(PartialApplicationData::Face),
            FaceMatch::NoMatch { distance } => Err(StepError::NoMatch { distance }),
            FaceMatch::NoFaceDetected { side } => Err(StepError::DetectionFailed(side)),
        }
    }
}

// ── Phone ───────────────────────────────────────────────────────────────

/// Input to the phone step: the number the code was sent to and the code.
#[derive(Debug, Clone)]
pub struct PhoneInput {
    pub phone_number: String,
    pub code: String,
}

/// Phone possession via OTP.
pub struct PhoneStep {
    otp: Arc<OtpService>,
}

impl PhoneStep {
    pub fn new(otp: Arc<OtpService>) -> Self {
        Self { otp }
    }
}

#[async_trait]
impl VerificationStep for PhoneStep {
    type Input = PhoneInput;

    fn step(&self) -> Step {
        Step::Phone
    }

    async fn attempt(
        &self,
        _data: &ApplicationData,
        input: PhoneInput,
    ) -> Result<PartialApplicationData, StepError> {
        let phone_number = self.otp.verify_otp(&input.phone_number, &input.code).await?;
        Ok(PartialApplicationData::Phone { phone_number })
    }
}
