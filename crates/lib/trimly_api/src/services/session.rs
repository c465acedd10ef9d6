//! Session resolution shared by the gate middleware and the auth handlers.

use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::{debug, warn};

use trimly_core::identity::jwt;
use trimly_core::models::session::{SessionClaims, SessionTokens};

use crate::AppState;
use crate::services::cookies;

/// Result of credential resolution for one request.
#[derive(Debug, Default)]
pub struct ResolvedSession {
    /// Claims of the effective session, if any.
    pub claims: Option<SessionClaims>,
    /// A renewed token pair that must be propagated to the response.
    pub renewed: Option<SessionTokens>,
}

/// Resolve the session carried by `jar`.
///
/// A valid token away from expiry is used as-is. A token that is absent,
/// expired or inside the refresh leeway triggers one transparent refresh;
/// a failed refresh yields no session, never a stale-but-accepted one.
pub async fn resolve(state: &AppState, jar: &CookieJar) -> ResolvedSession {
    let secret = state.config.identity_jwt_secret.as_bytes();

    if let Some(cookie) = jar.get(cookies::ACCESS_COOKIE)
        && let Some(claims) = jwt::verify_session_token(cookie.value(), secret)
        && !jwt::near_expiry(&claims, Utc::now())
    {
        return ResolvedSession {
            claims: Some(claims),
            renewed: None,
        };
    }

    if let Some(cookie) = jar.get(cookies::REFRESH_COOKIE) {
        match state.identity.refresh_session(cookie.value()).await {
            Ok(tokens) => {
                let claims = jwt::verify_session_token(&tokens.access_token, secret);
                if claims.is_none() {
                    warn!("refreshed session token failed local verification");
                }
                return ResolvedSession {
                    claims,
                    renewed: Some(tokens),
                };
            }
            Err(e) => {
                debug!(error = %e, "session refresh failed, treating as no session");
            }
        }
    }

    ResolvedSession::default()
}

/// The raw access token from the jar, for upstream logout.
pub fn access_token(jar: &CookieJar) -> Option<String> {
    jar.get(cookies::ACCESS_COOKIE)
        .map(|c| c.value().to_string())
}
