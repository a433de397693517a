//! HTTP API: stateless verification endpoints, onboarding sessions and
//! face model serving.

pub mod error;
pub mod form;
pub mod models;
pub mod onboarding;
pub mod verification;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::KycConfig;
use crate::face::{DisabledEmbedder, FaceEmbedder, FaceMatcher, HttpFaceEmbedder, ModelStore};
use crate::ocr::{
    ConvertPreprocessor, ImagePreprocessor, NoPreprocess, PanReader, TesseractEngine,
};
use crate::onboarding::{FaceStep, PanStep, PhoneStep, SessionRegistry};
use crate::otp::{LogSmsSender, MockVerifier, OtpPolicy, OtpService, OtpVerifier, StrictVerifier};
use crate::uploads::UploadStore;

pub use error::ApiError;

/// Largest accepted request body (card photos and webcam captures).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<PanReader>,
    pub otp: Arc<OtpService>,
    pub models: Arc<ModelStore>,
    pub uploads: Arc<UploadStore>,
    pub sessions: Arc<SessionRegistry>,
    pub pan_step: Arc<PanStep>,
    pub face_step: Arc<FaceStep>,
    pub phone_step: Arc<PhoneStep>,
}

impl AppState {
    pub fn new(
        reader: Arc<PanReader>,
        matcher: Arc<FaceMatcher>,
        otp: Arc<OtpService>,
        models: Arc<ModelStore>,
        uploads: Arc<UploadStore>,
    ) -> Self {
        Self {
            pan_step: Arc::new(PanStep::new(Arc::clone(&reader))),
            face_step: Arc::new(FaceStep::new(matcher, Arc::clone(&models))),
            phone_step: Arc::new(PhoneStep::new(Arc::clone(&otp))),
            reader,
            otp,
            models,
            uploads,
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    /// Wire the production collaborators described by `config`.
    pub fn from_config(config: &KycConfig) -> Self {
        let preprocessor: Arc<dyn ImagePreprocessor> = if config.preprocess {
            Arc::new(ConvertPreprocessor::new(config.convert_bin.clone()))
        } else {
            Arc::new(NoPreprocess)
        };
        let reader = PanReader::new(
            preprocessor,
            Arc::new(TesseractEngine::new(config.tesseract_bin.clone())),
        );

        let embedder: Arc<dyn FaceEmbedder> = match &config.face_service_url {
            Some(url) => Arc::new(HttpFaceEmbedder::new(url.clone())),
            None => Arc::new(DisabledEmbedder),
        };

        let otp_ttl = chrono::Duration::from_std(config.otp_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let session_ttl = chrono::Duration::from_std(config.session_ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let verifier: Arc<dyn OtpVerifier> = match config.otp_policy {
            OtpPolicy::Mock => Arc::new(MockVerifier),
            OtpPolicy::Strict => Arc::new(StrictVerifier::new(otp_ttl)),
        };
        let otp = OtpService::new(verifier, Arc::new(LogSmsSender)).with_max_age(otp_ttl);

        info!(
            preprocess = config.preprocess,
            face_service = config.face_service_url.as_deref().unwrap_or("disabled"),
            otp_policy = ?config.otp_policy,
            threshold = config.face_match_threshold,
            session_ttl_secs = config.session_ttl.as_secs(),
            "Collaborators configured"
        );

        Self::new(
            Arc::new(reader),
            Arc::new(FaceMatcher::new(embedder, config.face_match_threshold)),
            Arc::new(otp),
            Arc::new(ModelStore::new(config.models_dir.clone())),
            Arc::new(UploadStore::new(config.upload_dir.clone())),
        )
        .with_sessions(SessionRegistry::with_max_age(session_ttl))
    }

    /// Replace the session registry, e.g. to change its max age.
    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }
}

/// Build the full router.
pub fn kyc_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(models::health))
        // Stateless
        .route("/api/process-pan", post(verification::process_pan))
        .route("/api/verify-phone", post(verification::verify_phone))
        .route("/api/verify-otp", post(verification::verify_otp))
        // Sessions
        .route("/api/onboarding", post(onboarding::create_session))
        .route(
            "/api/onboarding/{id}",
            get(onboarding::get_session).delete(onboarding::delete_session),
        )
        .route("/api/onboarding/{id}/pan", post(onboarding::submit_pan))
        .route("/api/onboarding/{id}/face", post(onboarding::submit_face))
        .route("/api/onboarding/{id}/phone", post(onboarding::send_otp))
        .route("/api/onboarding/{id}/otp", post(onboarding::submit_otp))
        .route("/api/onboarding/{id}/chat", post(onboarding::chat))
        // Face models
        .route("/api/models/status", get(models::model_status))
        .route("/models/{file}", get(models::model_file))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}
