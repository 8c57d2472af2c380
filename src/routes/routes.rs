//! Defines routes for the lifecycle worker's HTTP surface.
//!
//! ## Structure
//! - **Introspection endpoints**
//!   - `GET  /status`  — last lifecycle run result (404 before the first run)
//!   - `GET  /history` — rolling run history, oldest first
//!   - `GET  /stats`   — live storage statistics from a fresh listing
//!
//! - **Trigger endpoint**
//!   - `POST /run`     — execute the pipeline synchronously
//!
//! Unmatched paths fall through to a plain-text usage banner.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        lifecycle_handlers::{history, status, storage_stats, trigger_run, usage},
    },
    services::lifecycle::LifecycleService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for the whole worker surface.
///
/// The router carries shared state (`LifecycleService`) to all handlers.
pub fn routes() -> Router<LifecycleService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // introspection
        .route("/status", get(status))
        .route("/history", get(history))
        .route("/stats", get(storage_stats))
        // on-demand trigger
        .route("/run", post(trigger_run))
        .fallback(usage)
}
