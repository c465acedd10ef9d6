//! Admin handlers: impersonation and the support profile listing.
//!
//! Reachable only outside production — the gate denies the whole `/admin`
//! namespace there. The allow-list and rate limiter below are the second
//! layer.

use axum::{Extension, Form, Json};
use axum::extract::State;

use trimly_core::impersonate;
use trimly_core::profiles::queries;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::gate::{ClientAddr, CurrentSession};
use crate::models::{ImpersonateForm, ImpersonateResponse, ProfileEntry, ProfilesResponse};

/// `POST /admin/impersonate` — generate a one-time sign-in link for the
/// target email. Throttled per caller address; allow-listed callers only.
pub async fn impersonate_handler(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Extension(addr): Extension<ClientAddr>,
    Form(body): Form<ImpersonateForm>,
) -> AppResult<Json<ImpersonateResponse>> {
    let target = body.email.trim();
    if target.is_empty() || !target.contains('@') {
        return Err(AppError::Validation("target email is invalid".into()));
    }

    let url = impersonate::generate_login_link(
        &state.pool,
        &state.identity,
        &state.config.admin_emails,
        session.0.as_ref().map(|c| c.email.as_str()),
        &addr.0,
        target,
    )
    .await?;

    Ok(Json(ImpersonateResponse { url }))
}

/// `GET /admin/profiles` — shop name + email listing for support.
pub async fn profiles_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ProfilesResponse>> {
    let profiles = queries::list_profiles(&state.pool)
        .await?
        .into_iter()
        .map(|p| ProfileEntry {
            shop_name: p.shop_name,
            email: p.email,
        })
        .collect();
    Ok(Json(ProfilesResponse { profiles }))
}
