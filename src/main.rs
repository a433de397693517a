use anyhow::Context;
use kyc_onboard::api::{AppState, kyc_routes};
use kyc_onboard::config::KycConfig;
use kyc_onboard::face::ModelStore;
use kyc_onboard::uploads::UploadStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = KycConfig::from_env().context("invalid configuration")?;

    // `kyc-onboard download-models` fetches the face model bundles and exits.
    if std::env::args().nth(1).as_deref() == Some("download-models") {
        let store = ModelStore::new(config.models_dir.clone());
        store
            .download_all(&reqwest::Client::new(), &config.models_base_url)
            .await
            .context("model download failed")?;
        tracing::info!(dir = %config.models_dir.display(), "Face models downloaded");
        return Ok(());
    }

    eprintln!("🪪 KYC Onboard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);
    eprintln!("   Uploads: {}", config.upload_dir.display());
    eprintln!("   Models: {}", config.models_dir.display());
    eprintln!(
        "   Face service: {}",
        config.face_service_url.as_deref().unwrap_or("not configured")
    );
    eprintln!("   OTP policy: {:?}\n", config.otp_policy);

    UploadStore::new(config.upload_dir.clone())
        .ensure_dir()
        .await
        .with_context(|| format!("cannot create {}", config.upload_dir.display()))?;

    let state = AppState::from_config(&config);
    if !state.models.status().await.ready {
        tracing::warn!(
            "Face models missing; face verification is disabled until `download-models` is run"
        );
    }

    let app = kyc_routes(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "KYC onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}
