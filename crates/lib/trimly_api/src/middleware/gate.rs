//! Session & entitlement gate middleware.
//!
//! Runs on every request: resolves the session credential (refreshing it
//! transparently when near expiry), classifies the caller's tier for
//! protected pages, and enforces the gate's route decision. Renewed
//! credentials are written onto the outgoing response; a renewed pair
//! that only lives in a local jar logs the tenant out on their next
//! request.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use std::net::SocketAddr;
use uuid::Uuid;

use trimly_core::gate::{self, AccessTier, GatePolicy, RouteDecision};
use trimly_core::models::session::{SessionClaims, SessionTokens};
use trimly_core::profiles::queries;

use crate::AppState;
use crate::error::AppError;
use crate::services::{cookies, session};

/// Key used to store the resolved session in request extensions. Present
/// on every gated request; `None` inside means anonymous.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<SessionClaims>);

/// Caller network address, as seen by the rate limiter.
#[derive(Debug, Clone)]
pub struct ClientAddr(pub String);

/// Axum middleware implementing the gate.
pub async fn entitlement_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    let policy = GatePolicy {
        environment: state.config.environment,
        enforce_auth: state.config.enforce_auth,
    };

    // The production admin lockout is independent of any credential, so it
    // short-circuits before credential or database work.
    if gate::admin_locked_out(policy.environment, &path) {
        return Err(AppError::Unauthorized(
            "admin namespace is disabled in production".into(),
        ));
    }

    let addr = client_addr(&request);
    request.extensions_mut().insert(ClientAddr(addr));

    let jar = CookieJar::from_headers(request.headers());
    let resolved = session::resolve(&state, &jar).await;

    let tier = match &resolved.claims {
        Some(claims) if gate::needs_entitlement(&path) => {
            Some(lookup_tier(&state, claims).await?)
        }
        _ => None,
    };

    request
        .extensions_mut()
        .insert(CurrentSession(resolved.claims.clone()));

    let response = match gate::decide(&policy, &path, resolved.claims.is_some(), tier) {
        RouteDecision::Deny => {
            return Err(AppError::Unauthorized(
                "admin namespace is disabled in production".into(),
            ));
        }
        RouteDecision::RedirectToLogin => Redirect::to("/login").into_response(),
        RouteDecision::RedirectToHome => Redirect::to("/").into_response(),
        RouteDecision::Allow => next.run(request).await,
    };

    Ok(attach_renewed_cookies(response, resolved.renewed))
}

/// Caller address: first hop of `x-forwarded-for`, else the socket peer.
fn client_addr(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".into())
}

/// Classify the caller's tier. Allow-listed admins bypass the profile
/// lookup entirely; a missing profile row counts as a fresh trial (the row
/// is created on the next session acquisition).
async fn lookup_tier(state: &AppState, claims: &SessionClaims) -> Result<AccessTier, AppError> {
    if state.config.is_admin_email(&claims.email) {
        return Ok(AccessTier::Admin);
    }
    let tenant_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthenticated("malformed session subject".into()))?;
    match queries::entitlement(&state.pool, tenant_id).await? {
        Some(entitlement) => Ok(gate::classify_tier(&entitlement, Utc::now())),
        None => Ok(AccessTier::Trial {
            days_remaining: gate::TRIAL_DAYS,
        }),
    }
}

/// Write a renewed credential pair onto the outgoing response.
fn attach_renewed_cookies(mut response: Response, renewed: Option<SessionTokens>) -> Response {
    if let Some(tokens) = renewed {
        let pair = [
            cookies::access_cookie(&tokens.access_token, tokens.expires_in),
            cookies::refresh_cookie(&tokens.refresh_token),
        ];
        for cookie in pair {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => tracing::error!(error = %e, "failed to encode renewed session cookie"),
            }
        }
    }
    response
}
