//! Billing portal handler.

use axum::{Extension, Json};
use axum::extract::State;

use trimly_core::billing::portal;
use trimly_core::profiles::queries;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::{require_user, tenant_id};
use crate::middleware::gate::CurrentSession;
use crate::models::PortalResponse;

/// `POST /api/billing/portal` — create a billing-portal session for the
/// tenant's stored customer reference. 401 without a session, 404 without
/// a reference on file (e.g. still in trial, no card).
pub async fn portal_handler(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> AppResult<Json<PortalResponse>> {
    let claims = require_user(session)?;
    let id = tenant_id(&claims)?;

    let customer = queries::billing_customer_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("no billing customer on file".into()))?;

    let return_url = format!("{}/dashboard", state.config.base_url);
    let url =
        portal::create_portal_session(&state.config.stripe_secret_key, &customer, &return_url)
            .await?;
    Ok(Json(PortalResponse { url }))
}
