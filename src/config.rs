//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::face::DEFAULT_MATCH_THRESHOLD;
use crate::otp::OtpPolicy;

/// Where the face-api.js weights are published.
pub const DEFAULT_MODELS_BASE_URL: &str =
    "https://raw.githubusercontent.com/justadudewhohacks/face-api.js/master/weights";

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct KycConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Directory uploaded card images and webcam captures are written to.
    pub upload_dir: PathBuf,
    /// Directory holding the face model bundles served to clients.
    pub models_dir: PathBuf,
    /// Base URL the model bundles are downloaded from.
    pub models_base_url: String,
    /// Endpoint of the face embedding service (None disables face matching).
    pub face_service_url: Option<String>,
    /// Euclidean distance below which two faces are considered the same person.
    pub face_match_threshold: f32,
    /// Path or name of the tesseract binary.
    pub tesseract_bin: String,
    /// Path or name of the ImageMagick `convert` binary.
    pub convert_bin: String,
    /// Whether card images are preprocessed before OCR.
    pub preprocess: bool,
    /// Which OTP verification policy to run.
    pub otp_policy: OtpPolicy,
    /// How long an issued OTP stays valid under the strict policy. Pending
    /// codes older than this are swept under either policy.
    pub otp_ttl: Duration,
    /// How long an onboarding session is kept after it is created.
    pub session_ttl: Duration,
}

impl Default for KycConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            upload_dir: PathBuf::from("./uploads"),
            models_dir: PathBuf::from("./public/models"),
            models_base_url: DEFAULT_MODELS_BASE_URL.to_string(),
            face_service_url: None,
            face_match_threshold: DEFAULT_MATCH_THRESHOLD,
            tesseract_bin: "tesseract".to_string(),
            convert_bin: "convert".to_string(),
            preprocess: true,
            otp_policy: OtpPolicy::Mock,
            otp_ttl: Duration::from_secs(300), // 5 minutes
            session_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl KycConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let otp_policy = match std::env::var("KYC_OTP_POLICY") {
            Ok(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "KYC_OTP_POLICY".to_string(),
                message,
            })?,
            Err(_) => defaults.otp_policy,
        };

        let config = Self {
            port: env_parse("PORT", defaults.port),
            upload_dir: std::env::var("KYC_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            models_dir: std::env::var("KYC_MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            models_base_url: std::env::var("KYC_MODELS_BASE_URL")
                .unwrap_or(defaults.models_base_url),
            face_service_url: std::env::var("KYC_FACE_SERVICE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            face_match_threshold: env_parse(
                "KYC_FACE_MATCH_THRESHOLD",
                defaults.face_match_threshold,
            ),
            tesseract_bin: std::env::var("KYC_TESSERACT_BIN").unwrap_or(defaults.tesseract_bin),
            convert_bin: std::env::var("KYC_CONVERT_BIN").unwrap_or(defaults.convert_bin),
            preprocess: env_parse("KYC_PREPROCESS", defaults.preprocess),
            otp_policy,
            otp_ttl: Duration::from_secs(env_parse(
                "KYC_OTP_TTL_SECS",
                defaults.otp_ttl.as_secs(),
            )),
            session_ttl: Duration::from_secs(env_parse(
                "KYC_SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service misbehave silently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.face_match_threshold.is_finite() || self.face_match_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "KYC_FACE_MATCH_THRESHOLD".to_string(),
                message: format!("must be a positive number, got {}", self.face_match_threshold),
            });
        }
        if self.otp_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "KYC_OTP_TTL_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.session_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "KYC_SESSION_TTL_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Parse an environment variable, keeping `default` when it is unset or
/// unparseable.
fn env_parse<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(
                key,
                value = %raw,
                default = %default,
                "Ignoring unparseable config value"
            );
            default
        }),
        Err(_) => default,
    }
}
