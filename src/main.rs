mod app;
mod auth;
mod config;
mod contacts;
mod error;
mod mailer;
mod rate_limit;
mod state;
mod storage;

use crate::rate_limit::RateLimitState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "contacts_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    // Limiter handle is built here and injected into the contact routes.
    let limiter = RateLimitState::new(app::CREATE_CONTACT_LIMIT, app::CREATE_CONTACT_WINDOW_SECS);

    let app = app::build_app(app_state, limiter);
    app::serve(app).await
}
