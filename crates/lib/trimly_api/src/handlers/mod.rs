//! Request handlers.

pub mod admin;
pub mod auth;
pub mod billing;
pub mod pages;
pub mod profile;
pub mod webhook;

use uuid::Uuid;

use trimly_core::models::session::SessionClaims;

use crate::error::AppError;
use crate::middleware::gate::CurrentSession;

/// Require an authenticated session on an API route. The gate never
/// redirects API paths, so absence answers 401 here.
pub(crate) fn require_user(session: CurrentSession) -> Result<SessionClaims, AppError> {
    session
        .0
        .ok_or_else(|| AppError::Unauthenticated("missing or expired session".into()))
}

/// The tenant id behind a session's subject claim.
pub(crate) fn tenant_id(claims: &SessionClaims) -> Result<Uuid, AppError> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthenticated("malformed session subject".into()))
}
