//! HTTP handlers for the lifecycle trigger and introspection endpoints.
//!
//! All state mutation happens inside `LifecycleService`; these handlers only
//! translate results and failures into HTTP shapes.

use crate::{
    errors::AppError,
    models::{run::LifecycleRunResult, stats::StorageStats},
    services::{lifecycle::LifecycleService, stats},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

/// `GET /status`
///
/// The last persisted run result, or 404 with a "no runs yet" message.
pub async fn status(
    State(service): State<LifecycleService>,
) -> Result<Json<LifecycleRunResult>, AppError> {
    match service.last_run().await? {
        Some(run) => Ok(Json(run)),
        None => Err(AppError::not_found("no lifecycle runs recorded yet")),
    }
}

/// `GET /history`
///
/// The persisted run history, oldest first. Empty before the first run.
pub async fn history(
    State(service): State<LifecycleService>,
) -> Result<Json<Vec<LifecycleRunResult>>, AppError> {
    Ok(Json(service.history().await?))
}

/// `GET /stats`
///
/// Live storage statistics from a fresh full listing. Read-only; works even
/// before any lifecycle run has ever executed.
pub async fn storage_stats(
    State(service): State<LifecycleService>,
) -> Result<Json<StorageStats>, AppError> {
    Ok(Json(stats::compute(service.store(), Utc::now()).await?))
}

/// `POST /run`
///
/// Execute the pipeline synchronously. Returns the full run result even when
/// individual objects failed (`errors` > 0); responds 409 while another run
/// is in progress and 500 when the pipeline itself could not complete.
pub async fn trigger_run(
    State(service): State<LifecycleService>,
) -> Result<Json<LifecycleRunResult>, AppError> {
    Ok(Json(service.run_once().await?))
}

/// Fallback for unmatched routes: plain-text usage banner.
pub async fn usage() -> impl IntoResponse {
    const BANNER: &str = concat!(
        "media-lifecycle\n",
        "\n",
        "  GET  /healthz   liveness\n",
        "  GET  /readyz    store round-trip probe\n",
        "  GET  /status    last lifecycle run result\n",
        "  GET  /history   recent run history (up to 30 entries)\n",
        "  GET  /stats     live storage statistics\n",
        "  POST /run       execute a lifecycle run now\n",
    );
    (StatusCode::NOT_FOUND, BANNER)
}
