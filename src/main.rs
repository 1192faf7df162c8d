mod app;
mod applications;
mod auth;
mod config;
mod db;
mod debug;
mod error;
mod extract;
mod jobs;
mod state;
mod storage;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "jobboard=debug,axum=info,tower_http=info".to_string());
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

    let config = AppConfig::from_env()?;
    tracing::info!(env = ?config.env, "starting");

    let app_state = AppState::init(config).await?;
    tracing::info!(storage = %app_state.db.mode(), "storage ready");

    app::serve(app::build_app(app_state)).await
}
