//! Session token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::models::session::SessionClaims;

/// A session this close to expiry (seconds) is refreshed before the gate
/// decides, so the decision is never made on a credential about to lapse.
pub const REFRESH_LEEWAY_SECS: i64 = 60;

/// Verify a provider-issued session JWT, returning the claims on success.
pub fn verify_session_token(token: &str, secret: &[u8]) -> Option<SessionClaims> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<SessionClaims>(token, &key, &validation)
        .ok()
        .map(|data| data.claims)
}

/// Whether the session should be transparently refreshed now.
pub fn near_expiry(claims: &SessionClaims, now: DateTime<Utc>) -> bool {
    claims.exp - now.timestamp() < REFRESH_LEEWAY_SECS
}
