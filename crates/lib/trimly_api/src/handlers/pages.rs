//! Page anchors and health.
//!
//! The web client renders the real views; these handlers give the gate its
//! route surface and serve minimal shells.

use axum::Json;
use axum::extract::State;
use axum::response::Html;

use crate::AppState;
use crate::models::HealthResponse;

pub async fn landing() -> Html<&'static str> {
    Html("<!doctype html><title>Trimly</title><h1>Trimly</h1>")
}

pub async fn login() -> Html<&'static str> {
    Html("<!doctype html><title>Log in — Trimly</title><div id=\"login\"></div>")
}

pub async fn register() -> Html<&'static str> {
    Html("<!doctype html><title>Register — Trimly</title><div id=\"register\"></div>")
}

pub async fn pricing() -> Html<&'static str> {
    Html("<!doctype html><title>Pricing — Trimly</title><div id=\"pricing\"></div>")
}

pub async fn dashboard() -> Html<&'static str> {
    Html("<!doctype html><title>Dashboard — Trimly</title><div id=\"app\"></div>")
}

/// `GET /api/health` — liveness plus database reachability.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_connected = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();
    Json(HealthResponse {
        status: "ok".into(),
        version: trimly_core::version().into(),
        db_connected,
    })
}
