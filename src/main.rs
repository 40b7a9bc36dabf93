use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use sanctuary::clock::SystemClock;
use sanctuary::config::{AppConfig, SweepMode};
use sanctuary::db;
use sanctuary::router::build_router;
use sanctuary::services::notifications::http::HttpMailer;
use sanctuary::services::notifications::log::LogMailer;
use sanctuary::services::notifications::Notifier;
use sanctuary::services::sweeper;
use sanctuary::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let notifier: Box<dyn Notifier> = if config.is_mail_configured() {
        tracing::info!("sending notifications via mail relay (url: {})", config.mail_api_url);
        Box::new(HttpMailer::new(
            config.mail_api_url.clone(),
            config.mail_api_key.clone(),
            config.mail_from.clone(),
        ))
    } else {
        tracing::warn!("MAIL_API_URL not set, notifications will only be logged");
        Box::new(LogMailer)
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier,
        clock: Arc::new(SystemClock),
    });

    if let SweepMode::Background { interval_secs } = config.sessions.sweep {
        sweeper::spawn_background_sweeper(
            Arc::clone(&state),
            std::time::Duration::from_secs(interval_secs),
        );
    }

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
