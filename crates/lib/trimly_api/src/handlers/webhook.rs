//! Payment provider webhook handler.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use trimly_core::billing::webhook;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::ReceivedResponse;

/// `POST /api/webhooks/stripe` — signed billing event.
///
/// Signature verification precedes everything; parsing precedes any
/// database work. 400 on signature or missing-field failures, 500 on
/// persistence failures so the provider redelivers, 200 `{received:true}`
/// otherwise (duplicates included).
pub async fn stripe_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Json<ReceivedResponse>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::UpstreamVerificationFailed("missing stripe-signature header".into())
        })?;

    webhook::verify_signature(&body, signature, &state.config.stripe_webhook_secret)?;

    let payload: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| AppError::UpstreamVerificationFailed(format!("invalid JSON payload: {e}")))?;

    webhook::apply_event(&state.pool, &state.config.plans, &state.mailer, &payload).await?;

    Ok(Json(ReceivedResponse { received: true }))
}
