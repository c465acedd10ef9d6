//! Tenant self-service handlers.

use axum::{Extension, Json};
use axum::extract::State;
use chrono::{NaiveDate, Utc};

use trimly_core::gate::{self, AccessTier};
use trimly_core::models::profile::Entitlement;
use trimly_core::profiles::queries;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::{require_user, tenant_id};
use crate::middleware::gate::CurrentSession;
use crate::models::{ClosingDatesRequest, ClosingDatesResponse, SubscriptionResponse};

/// `GET /api/subscription` — subscription status, trial countdown and
/// profile completeness for the session tenant.
pub async fn subscription_handler(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> AppResult<Json<SubscriptionResponse>> {
    let claims = require_user(session)?;
    let id = tenant_id(&claims)?;

    let overview = queries::subscription_overview(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("profile not found".into()))?;

    let tier = gate::classify_tier(
        &Entitlement {
            status: overview.status,
            trial_started_at: overview.trial_started_at,
        },
        Utc::now(),
    );
    let days_remaining = match tier {
        AccessTier::Trial { days_remaining } => days_remaining,
        _ => 0,
    };

    Ok(Json(SubscriptionResponse {
        status: overview.status,
        days_remaining,
        profile_complete: overview.phone.is_some(),
    }))
}

/// `PUT /api/profile/closing-dates` — merge ISO dates into the tenant's
/// closed-dates set and confirm the calendar.
pub async fn closing_dates_handler(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Json(body): Json<ClosingDatesRequest>,
) -> AppResult<Json<ClosingDatesResponse>> {
    let claims = require_user(session)?;
    let id = tenant_id(&claims)?;

    for date in &body.dates {
        if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
            return Err(AppError::Validation(format!(
                "not an ISO date (YYYY-MM-DD): {date}"
            )));
        }
    }

    let dates = queries::merge_closing_dates(&state.pool, id, &body.dates).await?;
    Ok(Json(ClosingDatesResponse {
        success: true,
        dates,
    }))
}
