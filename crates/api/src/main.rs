use anyhow::Context;
use drivegate_api::{build_router, state::AppState};
use drivegate_config::{REQUIRED_VARS, Settings};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "drivegate_api=debug,drivegate_services=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    for name in REQUIRED_VARS {
        if std::env::var(name).is_ok_and(|v| !v.trim().is_empty()) {
            info!(var = name, "Environment check: present");
        } else {
            warn!(var = name, "Environment check: missing");
        }
    }

    // Load config; missing secrets abort startup
    let settings = Settings::load().context("failed to load configuration")?;
    info!(
        redirect_uri = %settings.google.redirect_uri,
        scopes = ?settings.google.scopes,
        upload_dir = %settings.upload.dir,
        "Loaded configuration"
    );

    let app_state = AppState::new(settings.clone());
    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server is running on http://localhost:{}", settings.app.port);
    info!(
        "Visit http://localhost:{}/auth/google to start authentication",
        settings.app.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
