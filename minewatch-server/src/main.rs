/**
 * MINEWATCH - Point d'entrée du moniteur
 *
 * RÔLE : charge la config (.env, yaml, variables MINEWATCH_*), initialise les
 * logs, construit l'état partagé et sert l'API + le dashboard statique.
 */

use anyhow::{Context, Result};
use minewatch_server::{build_router, load_config, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Ok si .env n'existe pas
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("minewatch_server=info,tower_http=info")),
        )
        .init();

    let cfg = load_config().await;
    let addr = cfg.listen_addr();

    info!("Minewatch running at http://localhost:{}", cfg.listen_port);
    info!("Monitoring server: {}", cfg.game_addr());
    info!("Metrics endpoint: {}", cfg.metrics_url());

    let app = build_router(AppState::new(cfg));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Minewatch stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
