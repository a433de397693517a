//! Phone possession check via one-time codes.
//!
//! `OtpService` keeps one pending session per phone number. Whether a code
//! is accepted is decided by the configured [`OtpVerifier`]; delivery goes
//! through an [`SmsSender`]. Sessions older than the service's max age are
//! swept whenever a new code is issued.

pub mod sms;
pub mod verifier;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::OtpError;

pub use sms::{LogSmsSender, SmsSender};
pub use verifier::{MockVerifier, OtpVerifier, StrictVerifier};

/// Which verification policy the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPolicy {
    /// Accept any well-formed code once a session exists.
    Mock,
    /// Require the issued code, before it expires.
    Strict,
}

impl std::str::FromStr for OtpPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown OTP policy {other:?}, expected \"mock\" or \"strict\"")),
        }
    }
}

/// A 10-digit phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(input: &str) -> Result<Self, OtpError> {
        if input.len() == 10 && input.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(input.to_string()))
        } else {
            Err(OtpError::InvalidPhoneNumber)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exactly six ASCII digits.
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// A pending code for one phone number.
#[derive(Debug, Clone)]
pub struct OtpSession {
    pub phone_number: PhoneNumber,
    pub code: String,
    pub issued_at: DateTime<Utc>,
}

/// How long an unverified session is kept when no max age is configured.
pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 300;

/// Issues and checks one-time codes.
pub struct OtpService {
    sessions: RwLock<HashMap<PhoneNumber, OtpSession>>,
    verifier: Arc<dyn OtpVerifier>,
    sms: Arc<dyn SmsSender>,
    max_age: Duration,
}

impl OtpService {
    pub fn new(verifier: Arc<dyn OtpVerifier>, sms: Arc<dyn SmsSender>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            verifier,
            sms,
            max_age: Duration::seconds(DEFAULT_SESSION_MAX_AGE_SECS),
        }
    }

    /// Drop pending sessions once they are older than `max_age`.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Issue a fresh code for `phone_number`, replacing any pending one.
    ///
    /// The code is sent before the session is stored, so a failed dispatch
    /// leaves nothing behind to verify against.
    pub async fn send_otp(&self, phone_number: &str) -> Result<PhoneNumber, OtpError> {
        let phone = PhoneNumber::parse(phone_number)?;
        let code = generate_code();

        let message = format!("Your verification code is {code}");
        self.sms.send(&phone, &message).await?;

        let now = Utc::now();
        let session = OtpSession {
            phone_number: phone.clone(),
            code,
            issued_at: now,
        };
        {
            let mut sessions = self.sessions.write().await;
            let before = sessions.len();
            sessions.retain(|_, s| now - s.issued_at < self.max_age);
            let swept = before - sessions.len();
            if swept > 0 {
                debug!(swept, "Swept stale OTP sessions");
            }
            if sessions.insert(phone.clone(), session).is_some() {
                debug!(phone = %phone, "Replaced pending OTP");
            }
        }

        info!(phone = %phone, verifier = self.verifier.name(), "OTP issued");
        Ok(phone)
    }

    /// Check `code` for `phone_number`. Success consumes the session, as does
    /// an expired one; any other failure leaves it for an immediate retry.
    pub async fn verify_otp(
        &self,
        phone_number: &str,
        code: &str,
    ) -> Result<PhoneNumber, OtpError> {
        let phone = PhoneNumber::parse(phone_number)?;
        if !is_valid_code(code) {
            return Err(OtpError::InvalidCodeFormat);
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.get(&phone).ok_or_else(|| OtpError::NoSession {
            phone_number: phone.to_string(),
        })?;

        if let Err(e) = self.verifier.verify(session, code, Utc::now()) {
            warn!(phone = %phone, error = %e, "OTP rejected");
            if matches!(e, OtpError::Expired) {
                sessions.remove(&phone);
            }
            return Err(e);
        }

        sessions.remove(&phone);
        info!(phone = %phone, "OTP verified");
        Ok(phone)
    }

    /// Whether a code is pending for `phone_number`.
    pub async fn has_pending(&self, phone_number: &PhoneNumber) -> bool {
        self.sessions.read().await.contains_key(phone_number)
    }

    pub async fn pending_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Uniform six-digit code without a leading zero.
fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Captures outgoing messages instead of sending them.
    #[derive(Default)]
    struct CapturingSms {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl CapturingSms {
        fn last_code(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let (_, message) = sent.last().expect("no SMS sent");
            message.rsplit(' ').next().unwrap().to_string()
        }
    }

    #[async_trait]
    impl SmsSender for CapturingSms {
        async fn send(&self, phone: &PhoneNumber, message: &str) -> Result<(), OtpError> {
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct FailingSms;

    #[async_trait]
    impl SmsSender for FailingSms {
        async fn send(&self, _phone: &PhoneNumber, _message: &str) -> Result<(), OtpError> {
            Err(OtpError::Dispatch("gateway down".to_string()))
        }
    }

    fn mock_service() -> (OtpService, Arc<CapturingSms>) {
        let sms = Arc::new(CapturingSms::default());
        (OtpService::new(Arc::new(MockVerifier), sms.clone()), sms)
    }

    fn strict_service(ttl: chrono::Duration) -> (OtpService, Arc<CapturingSms>) {
        let sms = Arc::new(CapturingSms::default());
        let verifier = Arc::new(StrictVerifier::new(ttl));
        (OtpService::new(verifier, sms.clone()), sms)
    }

    #[test]
    fn phone_number_must_be_ten_digits() {
        assert!(PhoneNumber::parse("9876543210").is_ok());
        let bad_numbers = [
            "",
            "987654321",
            "98765432100",
            "98765x3210",
            "+919876543",
            "９８７６５４３２１０",
        ];
        for bad in bad_numbers {
            assert!(PhoneNumber::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn code_must_be_six_digits() {
        assert!(is_valid_code("123456"));
        assert!(!is_valid_code("12345"));
        assert!(!is_valid_code("1234567"));
        assert!(!is_valid_code("12345a"));
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert!(is_valid_code(&code), "{code}");
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn policy_parses() {
        assert_eq!("mock".parse::<OtpPolicy>().unwrap(), OtpPolicy::Mock);
        assert_eq!(" STRICT ".parse::<OtpPolicy>().unwrap(), OtpPolicy::Strict);
        assert!("lenient".parse::<OtpPolicy>().is_err());
    }

    #[tokio::test]
    async fn send_rejects_bad_phone_without_dispatch() {
        let (svc, sms) = mock_service();
        assert!(matches!(
            svc.send_otp("12345").await,
            Err(OtpError::InvalidPhoneNumber)
        ));
        assert!(sms.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_dispatches_code() {
        let (svc, sms) = mock_service();
        let phone = svc.send_otp("9876543210").await.unwrap();

        assert!(svc.has_pending(&phone).await);
        assert!(is_valid_code(&sms.last_code()));
        assert_eq!(sms.sent.lock().unwrap()[0].0, "9876543210");
    }

    #[tokio::test]
    async fn dispatch_failure_leaves_no_session() {
        let svc = OtpService::new(Arc::new(MockVerifier), Arc::new(FailingSms));
        assert!(matches!(
            svc.send_otp("9876543210").await,
            Err(OtpError::Dispatch(_))
        ));

        let phone = PhoneNumber::parse("9876543210").unwrap();
        assert!(!svc.has_pending(&phone).await);
        assert!(matches!(
            svc.verify_otp("9876543210", "000000").await,
            Err(OtpError::NoSession { .. })
        ));
    }

    #[tokio::test]
    async fn issuing_sweeps_stale_sessions() {
        let (svc, _sms) = mock_service();
        let svc = svc.with_max_age(Duration::zero());
        svc.send_otp("9876543210").await.unwrap();
        svc.send_otp("9123456780").await.unwrap();

        assert_eq!(svc.pending_count().await, 1);
        let first = PhoneNumber::parse("9876543210").unwrap();
        let second = PhoneNumber::parse("9123456780").unwrap();
        assert!(!svc.has_pending(&first).await);
        assert!(svc.has_pending(&second).await);
    }

    #[tokio::test]
    async fn fresh_sessions_survive_sweep() {
        let (svc, _sms) = mock_service();
        svc.send_otp("9876543210").await.unwrap();
        svc.send_otp("9123456780").await.unwrap();
        assert_eq!(svc.pending_count().await, 2);
    }

    #[tokio::test]
    async fn mock_accepts_any_code_once_session_exists() {
        let (svc, _sms) = mock_service();
        svc.send_otp("9876543210").await.unwrap();

        let phone = svc.verify_otp("9876543210", "000000").await.unwrap();
        assert_eq!(phone.as_str(), "9876543210");
        assert!(!svc.has_pending(&phone).await, "session should be consumed");
    }

    #[tokio::test]
    async fn verify_without_session_fails() {
        let (svc, _sms) = mock_service();
        assert!(matches!(
            svc.verify_otp("9876543210", "123456").await,
            Err(OtpError::NoSession { .. })
        ));
    }

    #[tokio::test]
    async fn session_is_one_shot() {
        let (svc, _sms) = mock_service();
        svc.send_otp("9876543210").await.unwrap();
        svc.verify_otp("9876543210", "123456").await.unwrap();
        assert!(matches!(
            svc.verify_otp("9876543210", "123456").await,
            Err(OtpError::NoSession { .. })
        ));
    }

    #[tokio::test]
    async fn verify_checks_code_format_first() {
        let (svc, _sms) = mock_service();
        svc.send_otp("9876543210").await.unwrap();
        assert!(matches!(
            svc.verify_otp("9876543210", "12ab56").await,
            Err(OtpError::InvalidCodeFormat)
        ));
        // Malformed attempt does not consume the session.
        assert!(svc.verify_otp("9876543210", "123456").await.is_ok());
    }

    #[tokio::test]
    async fn strict_requires_issued_code() {
        let (svc, sms) = strict_service(chrono::Duration::minutes(5));
        svc.send_otp("9876543210").await.unwrap();
        let code = sms.last_code();
        let wrong = if code == "111111" { "222222" } else { "111111" };

        assert!(matches!(
            svc.verify_otp("9876543210", wrong).await,
            Err(OtpError::CodeMismatch)
        ));
        assert!(svc.verify_otp("9876543210", &code).await.is_ok());
    }

    #[tokio::test]
    async fn strict_rejects_and_evicts_expired_code() {
        let (svc, sms) = strict_service(chrono::Duration::zero());
        svc.send_otp("9876543210").await.unwrap();
        let code = sms.last_code();

        assert!(matches!(
            svc.verify_otp("9876543210", &code).await,
            Err(OtpError::Expired)
        ));
        assert_eq!(svc.pending_count().await, 0);
        assert!(matches!(
            svc.verify_otp("9876543210", &code).await,
            Err(OtpError::NoSession { .. })
        ));
    }

    #[tokio::test]
    async fn resend_replaces_pending_code() {
        let (svc, sms) = strict_service(chrono::Duration::minutes(5));
        svc.send_otp("9876543210").await.unwrap();
        let first = sms.last_code();
        svc.send_otp("9876543210").await.unwrap();
        let second = sms.last_code();

        if first != second {
            assert!(matches!(
                svc.verify_otp("9876543210", &first).await,
                Err(OtpError::CodeMismatch)
            ));
        }
        assert!(svc.verify_otp("9876543210", &second).await.is_ok());
    }
}
