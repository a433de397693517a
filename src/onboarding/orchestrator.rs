//! The orchestrator owns the application data and advances the wizard.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::model::{
    ApplicationData, ApplicationStatus, ApplicationSummary, PartialApplicationData,
    application_date,
};
use super::state::Step;
use super::steps::VerificationStep;
use crate::error::OrchestratorError;

/// Drives one onboarding attempt through Pan → Face → Phone → Summary.
///
/// The current step is always derived from the application data; there is
/// no separate step counter to fall out of sync.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    data: ApplicationData,
    completed_at: Option<DateTime<Utc>>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &ApplicationData {
        &self.data
    }

    pub fn current_step(&self) -> Step {
        self.data.current_step()
    }

    pub fn is_complete(&self) -> bool {
        self.data.is_complete()
    }

    /// Run `step` against the current data and apply its result.
    ///
    /// The step must be the active one. A failed attempt leaves the data
    /// untouched, so the user can retry immediately.
    pub async fn submit<S: VerificationStep>(
        &mut self,
        step: &S,
        input: S::Input,
    ) -> Result<Step, OrchestratorError> {
        let active = self.current_step();
        if step.step() != active {
            return Err(OrchestratorError::WrongStep {
                active,
                attempted: step.step(),
            });
        }

        let partial = match step.attempt(&self.data, input).await {
            Ok(partial) => partial,
            Err(e) => {
                warn!(step = %active, error = %e, "Verification step failed");
                return Err(e.into());
            }
        };
        self.apply(partial)
    }

    /// Merge a step's result and advance. Returns the new current step.
    pub fn apply(&mut self, partial: PartialApplicationData) -> Result<Step, OrchestratorError> {
        let active = self.current_step();
        let attempted = partial.step();
        if attempted != active {
            return Err(OrchestratorError::WrongStep { active, attempted });
        }

        match partial {
            PartialApplicationData::Pan {
                pan_number,
                pan_image,
            } => {
                self.data.pan_number = Some(pan_number);
                self.data.pan_image = pan_image;
                self.data.pan_verified = true;
            }
            PartialApplicationData::Face => {
                if self.data.pan_image.is_none() {
                    return Err(OrchestratorError::MissingReferenceImage);
                }
                self.data.face_verified = true;
            }
            PartialApplicationData::Phone { phone_number } => {
                self.data.phone_number = Some(phone_number);
                self.data.phone_verified = true;
            }
        }

        let next = self.current_step();
        debug_assert!(active.can_transition_to(next));
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        info!(from = %active, to = %next, "Onboarding step completed");
        Ok(next)
    }

    /// The finalized application, once every verification is done.
    pub fn summary(&self) -> Option<ApplicationSummary> {
        if !self.is_complete() {
            return None;
        }
        let completed_at = self.completed_at.unwrap_or_else(Utc::now);
        Some(ApplicationSummary {
            status: ApplicationStatus::Complete,
            pan_number: self.data.pan_number.clone()?,
            phone_number: self.data.phone_number.clone()?,
            pan_verified: self.data.pan_verified,
            face_verified: self.data.face_verified,
            phone_verified: self.data.phone_verified,
            application_date: application_date(completed_at),
            completed_at,
        })
    }
}
