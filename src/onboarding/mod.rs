//! Onboarding wizard: PAN, face and phone verification in a fixed order.
//!
//! The [`Orchestrator`] owns the application data. Each verification step
//! implements [`VerificationStep`]: it reads the data, calls its adapter and
//! hands back a [`PartialApplicationData`], which only the orchestrator
//! merges. Sessions pair an orchestrator with the assistant transcript.

pub mod assistant;
pub mod model;
pub mod orchestrator;
pub mod session;
pub mod state;
pub mod steps;

pub use assistant::{ChatMessage, Sender, Transcript};
pub use model::{ApplicationData, ApplicationStatus, ApplicationSummary, PartialApplicationData};
pub use orchestrator::Orchestrator;
pub use session::{OnboardingSession, SessionRegistry, SessionStatus};
pub use state::Step;
pub use steps::{FaceInput, FaceStep, PanInput, PanStep, PhoneInput, PhoneStep, VerificationStep};
