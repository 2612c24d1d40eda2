use anyhow::Context;
use tracing_subscriber::EnvFilter;

use educonnect_api::app::app;
use educonnect_api::config::AppConfig;
use educonnect_api::database::DatabaseManager;
use educonnect_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, COGNITO_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting EduConnect API in {:?} mode", config.environment);

    let database =
        DatabaseManager::from_config(&config.database).context("Database is not configured")?;

    if config.database.run_migrations {
        if let Err(e) = database.migrate().await {
            tracing::warn!(error = %e, "Migrations failed; continuing with the existing schema");
        }
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config, database.clone())
        .context("Failed to configure the mailer")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("EduConnect API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
