//! Authentication request handlers.
//!
//! Thin orchestration over the identity provider: every successful session
//! acquisition sets both httpOnly cookies and ensures the tenant's profile
//! row exists.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;

use trimly_core::models::session::SessionTokens;
use trimly_core::profiles::queries;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    AuthUser, LoginRequest, LogoutResponse, ResetRequest, SessionResponse, SignupRequest,
    SuccessResponse,
};
use crate::services::{cookies, session};

/// Landing page after an auth redirect when the caller gave none.
const DEFAULT_NEXT: &str = "/dashboard";

/// Set both session cookies and make sure the tenant profile exists.
async fn establish_session(
    state: &AppState,
    jar: CookieJar,
    tokens: &SessionTokens,
    email_hint: Option<&str>,
) -> AppResult<CookieJar> {
    let email = tokens
        .user
        .email
        .as_deref()
        .or(email_hint)
        .unwrap_or_default()
        .to_string();
    queries::ensure_profile(&state.pool, tokens.user.id, &email, tokens.user.shop_name()).await?;
    Ok(jar
        .add(cookies::access_cookie(&tokens.access_token, tokens.expires_in))
        .add(cookies::refresh_cookie(&tokens.refresh_token)))
}

/// Only same-origin paths are allowed as redirect targets.
fn safe_next(next: Option<String>) -> String {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") => n,
        _ => DEFAULT_NEXT.to_string(),
    }
}

/// `POST /auth/login` — password grant against the identity provider.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<SessionResponse>)> {
    let tokens = state
        .identity
        .sign_in_with_password(&body.email, &body.password)
        .await?;
    let jar = establish_session(&state, jar, &tokens, Some(&body.email)).await?;
    let email = tokens.user.email.unwrap_or(body.email);
    Ok((
        jar,
        Json(SessionResponse {
            user: AuthUser {
                id: tokens.user.id,
                email,
            },
            expires_in: tokens.expires_in,
        }),
    ))
}

/// `POST /auth/signup` — register a tenant. The provider emails a
/// confirmation link routed back through `/auth/callback`.
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let redirect_to = format!("{}/auth/callback", state.config.base_url);
    state
        .identity
        .sign_up(
            &body.email,
            &body.password,
            body.shop_name.as_deref().map(str::trim),
            &redirect_to,
        )
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
}

/// `GET /auth/callback?code&next` — exchange a one-time code for a
/// session. Tolerates double invocation: an already-valid session wins.
pub async fn callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> AppResult<(CookieJar, Redirect)> {
    let next = safe_next(params.next);

    // Confirmation emails sometimes get fetched twice; if the first
    // exchange already produced a session, just follow the redirect.
    if let Some(cookie) = jar.get(cookies::ACCESS_COOKIE)
        && trimly_core::identity::jwt::verify_session_token(
            cookie.value(),
            state.config.identity_jwt_secret.as_bytes(),
        )
        .is_some()
    {
        return Ok((jar, Redirect::to(&next)));
    }

    let Some(code) = params.code else {
        return Ok((jar, Redirect::to("/login?error=missing_code")));
    };

    match state.identity.exchange_code(&code).await {
        Ok(tokens) => {
            let jar = establish_session(&state, jar, &tokens, None).await?;
            Ok((jar, Redirect::to(&next)))
        }
        Err(e) => {
            warn!(error = %e, "auth code exchange failed");
            Ok((jar, Redirect::to("/login?error=link_expired")))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
    pub token_hash: String,
    #[serde(rename = "type")]
    pub otp_type: String,
    pub next: Option<String>,
}

/// `GET /auth/confirm?token_hash&type&next` — email-confirmation OTP
/// verification.
pub async fn confirm_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<ConfirmParams>,
) -> AppResult<(CookieJar, Redirect)> {
    let next = safe_next(params.next);
    match state
        .identity
        .verify_otp(&params.otp_type, &params.token_hash)
        .await
    {
        Ok(tokens) => {
            let jar = establish_session(&state, jar, &tokens, None).await?;
            Ok((jar, Redirect::to(&next)))
        }
        Err(e) => {
            warn!(error = %e, "otp verification failed");
            Ok((jar, Redirect::to("/login?error=confirmation_failed")))
        }
    }
}

/// `POST /auth/logout` — revoke the session upstream (best effort) and
/// clear both cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<LogoutResponse>)> {
    if let Some(token) = session::access_token(&jar)
        && let Err(e) = state.identity.logout(&token).await
    {
        warn!(error = %e, "upstream logout failed, clearing cookies anyway");
    }
    let jar = jar
        .add(cookies::clear_access_cookie())
        .add(cookies::clear_refresh_cookie());
    Ok((jar, Json(LogoutResponse { success: true })))
}

/// `POST /auth/reset` — request a password-recovery email.
pub async fn reset_handler(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let redirect_to = format!("{}/auth/callback", state.config.base_url);
    state.identity.recover(&body.email, &redirect_to).await?;
    Ok(Json(SuccessResponse { success: true }))
}
