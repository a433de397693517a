//! Onboarding sessions and the in-memory registry that holds them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::assistant::{ChatMessage, Transcript};
use super::model::{ApplicationData, ApplicationSummary};
use super::orchestrator::Orchestrator;
use super::state::Step;
use super::steps::VerificationStep;
use crate::error::OrchestratorError;
use crate::otp::PhoneNumber;

/// One user's pass through the wizard.
#[derive(Debug)]
pub struct OnboardingSession {
    id: Uuid,
    orchestrator: Orchestrator,
    transcript: Transcript,
    /// Number an OTP was last sent to from this session.
    pending_phone: Option<PhoneNumber>,
    created_at: DateTime<Utc>,
}

/// Snapshot returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub step: Step,
    pub step_number: u8,
    pub complete: bool,
    pub face_step_enabled: bool,
    pub data: ApplicationData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ApplicationSummary>,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

impl OnboardingSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            orchestrator: Orchestrator::new(),
            transcript: Transcript::new(),
            pending_phone: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn current_step(&self) -> Step {
        self.orchestrator.current_step()
    }

    pub fn pending_phone(&self) -> Option<&PhoneNumber> {
        self.pending_phone.as_ref()
    }

    pub fn set_pending_phone(&mut self, phone: PhoneNumber) {
        self.pending_phone = Some(phone);
    }

    /// Run a step and, on success, narrate the step the wizard moved to.
    pub async fn submit<S: VerificationStep>(
        &mut self,
        step: &S,
        input: S::Input,
    ) -> Result<Step, OrchestratorError> {
        let next = self.orchestrator.submit(step, input).await?;
        if next == Step::Summary {
            self.pending_phone = None;
        }
        self.transcript.narrate_step(next, self.orchestrator.data());
        info!(session_id = %self.id, step = %next, "Session advanced");
        Ok(next)
    }

    pub fn chat(&mut self, text: &str) -> bool {
        self.transcript.user_says(text)
    }

    /// Client view. `models_ready` says whether face matching can run.
    pub fn status(&self, models_ready: bool) -> SessionStatus {
        let data = self.orchestrator.data();
        let step = self.current_step();
        SessionStatus {
            session_id: self.id,
            step,
            step_number: step.number(),
            complete: self.orchestrator.is_complete(),
            face_step_enabled: step == Step::Face && models_ready && data.pan_image().is_some(),
            data: data.clone(),
            summary: self.orchestrator.summary(),
            messages: self.transcript.messages().to_vec(),
            created_at: self.created_at,
        }
    }
}

impl Default for OnboardingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// How long a session is kept when no max age is configured.
pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 60 * 60;

struct RegistryEntry {
    created_at: DateTime<Utc>,
    handle: Arc<Mutex<OnboardingSession>>,
}

/// Live sessions, keyed by id. Each session has its own lock so requests
/// against one session are applied one at a time.
///
/// Sessions older than the registry's max age, finished or not, are treated
/// as gone and swept whenever a new session is created.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, RegistryEntry>>,
    max_age: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_max_age(Duration::seconds(DEFAULT_SESSION_MAX_AGE_SECS))
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age,
        }
    }

    fn is_live(&self, entry: &RegistryEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at < self.max_age
    }

    /// Start a new session and return a handle to it.
    pub async fn create(&self) -> Arc<Mutex<OnboardingSession>> {
        let session = OnboardingSession::new();
        let id = session.id();
        let entry = RegistryEntry {
            created_at: session.created_at(),
            handle: Arc::new(Mutex::new(session)),
        };
        let handle = Arc::clone(&entry.handle);

        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, e| self.is_live(e, now));
        let swept = before - sessions.len();
        if swept > 0 {
            debug!(swept, "Swept expired onboarding sessions");
        }
        sessions.insert(id, entry);
        drop(sessions);

        info!(session_id = %id, "Onboarding session created");
        handle
    }

    /// Look up a live session. Expired sessions are reported as absent.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<OnboardingSession>>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .filter(|e| self.is_live(e, Utc::now()))
            .map(|e| Arc::clone(&e.handle))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            debug!(session_id = %id, "Onboarding session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
