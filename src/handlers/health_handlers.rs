//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that round-trips a probe object through the store

use crate::services::lifecycle::LifecycleService;
use crate::services::retention::CONTROL_PREFIX;
use crate::services::store::PutOptions;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that writes, reads back, and deletes a uniquely named
/// probe object in the control namespace. Returns JSON describing the check;
/// HTTP 200 when it passes, HTTP 503 when it fails.
pub async fn readyz(State(service): State<LifecycleService>) -> impl IntoResponse {
    let store = service.store();
    let probe_key = format!("{CONTROL_PREFIX}.readyz-{}", Uuid::new_v4());

    let store_check = async {
        store
            .put(
                &probe_key,
                Bytes::from_static(b"readyz"),
                PutOptions::default(),
            )
            .await
            .map_err(|e| format!("could not write probe object: {e}"))?;
        let fetched = store
            .get(&probe_key)
            .await
            .map_err(|e| format!("could not read probe object: {e}"))?;
        if fetched.body.as_ref() != b"readyz" {
            // best-effort cleanup
            let _ = store.delete(&probe_key).await;
            return Err("probe object content mismatch".to_string());
        }
        store
            .delete(&probe_key)
            .await
            .map_err(|e| format!("could not delete probe object: {e}"))?;
        Ok::<(), String>(())
    }
    .await;

    let store_ok = store_check.is_ok();
    let mut checks = HashMap::new();
    checks.insert(
        "store",
        CheckStatus {
            ok: store_ok,
            error: store_check.err(),
        },
    );

    let body = ReadyResponse {
        status: if store_ok { "ok".into() } else { "error".into() },
        checks,
    };

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
