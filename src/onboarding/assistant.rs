//! Assistant transcript for the chat panel that narrates the wizard.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::model::ApplicationData;
use super::state::Step;

pub const WELCOME: &str = "Hello! I'm your bank account opening assistant. Let's get started with the verification process.";
pub const PAN_PROMPT: &str =
    "Please verify your PAN card by uploading a photo or entering the number manually.";
pub const FACE_PROMPT: &str =
    "Now, let's verify your identity by matching your face with the PAN card photo.";
pub const PHONE_PROMPT: &str =
    "Finally, please enter your phone number to receive an OTP for verification.";
pub const FALLBACK_REPLY: &str =
    "Please follow the steps shown on the screen to complete your account opening.";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Bot,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

/// Ordered chat history for one session.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// A transcript opening with the welcome and the PAN prompt.
    pub fn new() -> Self {
        let mut transcript = Self {
            messages: Vec::new(),
        };
        transcript.bot(WELCOME);
        transcript.bot(PAN_PROMPT);
        transcript
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Announce that the wizard moved to `step`.
    pub fn narrate_step(&mut self, step: Step, data: &ApplicationData) {
        match step {
            Step::Pan => {}
            Step::Face => self.bot(FACE_PROMPT),
            Step::Phone => self.bot(PHONE_PROMPT),
            Step::Summary => {
                let pan = data.pan_number().map(|p| p.as_str()).unwrap_or_default();
                let phone = data.phone_number().map(|p| p.as_str()).unwrap_or_default();
                self.bot(&format!(
                    "All verifications complete! Your account will be activated within 24 hours. PAN: {pan}, Phone: {phone}"
                ));
            }
        }
    }

    /// Record free-form user input. Blank input is ignored.
    pub fn user_says(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.push(Sender::User, text);
        self.bot(FALLBACK_REPLY);
        true
    }

    fn bot(&mut self, text: &str) {
        self.push(Sender::Bot, text);
    }

    fn push(&mut self, sender: Sender, text: &str) {
        self.messages.push(ChatMessage {
            text: text.to_string(),
            sender,
            timestamp: Utc::now(),
        });
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
