//! OTP verification policies.

use chrono::{DateTime, Duration, Utc};

use super::OtpSession;
use crate::error::OtpError;

/// Decides whether a well-formed code is accepted for a pending session.
pub trait OtpVerifier: Send + Sync {
    /// Policy name for logs.
    fn name(&self) -> &str;

    fn verify(&self, session: &OtpSession, code: &str, now: DateTime<Utc>) -> Result<(), OtpError>;
}

/// Reference policy: any well-formed code passes once a session exists.
///
/// This proves nothing about possession of the phone. Use [`StrictVerifier`]
/// for anything beyond a demo.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockVerifier;

impl OtpVerifier for MockVerifier {
    fn name(&self) -> &str {
        "mock"
    }

    fn verify(
        &self,
        _session: &OtpSession,
        _code: &str,
        _now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        Ok(())
    }
}

/// Code must equal the issued one and be used within `ttl`.
#[derive(Debug, Clone, Copy)]
pub struct StrictVerifier {
    ttl: Duration,
}

impl StrictVerifier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl OtpVerifier for StrictVerifier {
    fn name(&self) -> &str {
        "strict"
    }

    fn verify(&self, session: &OtpSession, code: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        if now >= session.issued_at + self.ttl {
            return Err(OtpError::Expired);
        }
        if session.code != code {
            return Err(OtpError::CodeMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::PhoneNumber;

    fn session(issued_at: DateTime<Utc>) -> OtpSession {
        OtpSession {
            phone_number: PhoneNumber::parse("9876543210").unwrap(),
            code: "482913".to_string(),
            issued_at,
        }
    }

    #[test]
    fn mock_accepts_anything() {
        let s = session(Utc::now() - Duration::days(1));
        assert!(MockVerifier.verify(&s, "000000", Utc::now()).is_ok());
    }

    #[test]
    fn strict_checks_equality_and_expiry() {
        let issued = Utc::now();
        let s = session(issued);
        let v = StrictVerifier::new(Duration::minutes(5));

        assert!(v.verify(&s, "482913", issued + Duration::minutes(4)).is_ok());
        assert!(matches!(
            v.verify(&s, "482914", issued + Duration::minutes(1)),
            Err(OtpError::CodeMismatch)
        ));
        assert!(matches!(
            v.verify(&s, "482913", issued + Duration::minutes(5)),
            Err(OtpError::Expired)
        ));
    }
}
