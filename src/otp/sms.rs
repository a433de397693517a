//! SMS delivery.

use async_trait::async_trait;
use tracing::info;

use super::PhoneNumber;
use crate::error::OtpError;

/// Delivers a text message to a phone.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &PhoneNumber, message: &str) -> Result<(), OtpError>;
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, phone: &PhoneNumber, message: &str) -> Result<(), OtpError> {
        info!(phone = %phone, message, "Mock SMS sent");
        Ok(())
    }
}
