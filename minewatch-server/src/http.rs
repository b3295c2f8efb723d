/**
 * API HTTP MINEWATCH - Serveur HTTP du moniteur
 *
 * RÔLE :
 * Expose l'état du serveur de jeu et de la machine hôte au dashboard web.
 *
 * FONCTIONNEMENT :
 * - Routes : /api/stats (snapshot complet), /api/health (liveness)
 * - Tout le reste est servi depuis le répertoire statique (dashboard)
 * - Chaque appel /api/stats relance scrape + collecte hôte + probe TCP,
 *   en parallèle, sans cache
 * - Une erreur inattendue (y compris un panic dans un handler) devient un
 *   500 `{ "error": ... }`
 */

use crate::error::ApiError;
use crate::minecraft::MinecraftStatus;
use crate::probe::ReachabilityResult;
use crate::state::AppState;
use crate::system::HostSnapshot;
use crate::units::epoch_millis;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::any::Any;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Epoch milliseconds.
    pub timestamp: u64,
    pub minecraft: MinecraftStatus,
    pub system: HostSnapshot,
    pub server_status: ReachabilityResult,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: u64,
}

pub fn build_router(app_state: AppState) -> Router {
    let assets = ServeDir::new(&app_state.cfg.static_dir);

    let routes = Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/health", get(get_health))
        .fallback_service(assets)
        .with_state(app_state);

    with_middleware(routes)
}

fn with_middleware(routes: Router) -> Router {
    routes
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(details).into_response()
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        "{method} {path} -> {} ({} ms)",
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

// GET /api/stats (scrape + hôte + probe, joints)
async fn get_stats(State(app): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let (minecraft, system, server_status) = tokio::join!(
        app.metrics.collect(),
        HostSnapshot::collect(),
        app.prober.probe(),
    );

    Ok(Json(StatsResponse {
        timestamp: epoch_millis(),
        minecraft,
        system: system?,
        server_status,
    }))
}

// GET /api/health
async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: epoch_millis(),
    })
}
