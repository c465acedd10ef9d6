//! Admin impersonation: one-time sign-in links for support access.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::identity::{IdentityError, client::IdentityClient};
use crate::ratelimit::{self, AttemptDecision, RateLimitError};

/// Impersonation errors.
#[derive(Debug, Error)]
pub enum ImpersonateError {
    #[error("too many impersonation attempts, retry later")]
    RateLimited,

    #[error("caller is not on the admin allow-list")]
    NotAllowed,

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Generate a one-time sign-in link for `target_email`.
///
/// Every attempt is throttled per caller address before anything else,
/// allow-list misses included, so probing the allow-list burns quota.
/// Only then is the caller's authenticated email checked against the
/// allow-list, and only for allow-listed callers is a link generated.
pub async fn generate_login_link(
    pool: &PgPool,
    identity: &IdentityClient,
    allow_list: &[String],
    caller_email: Option<&str>,
    caller_address: &str,
    target_email: &str,
) -> Result<String, ImpersonateError> {
    match ratelimit::register_attempt(pool, caller_address).await? {
        AttemptDecision::Limited => {
            warn!(address = caller_address, "impersonation rate limit hit");
            return Err(ImpersonateError::RateLimited);
        }
        AttemptDecision::Allowed { number } => {
            info!(
                address = caller_address,
                attempt = number,
                "impersonation attempt"
            );
        }
    }

    let caller = caller_email.ok_or(ImpersonateError::NotAllowed)?;
    if !is_allow_listed(allow_list, caller) {
        warn!(caller, "impersonation denied: not allow-listed");
        return Err(ImpersonateError::NotAllowed);
    }

    let link = identity.generate_magic_link(target_email).await?;
    info!(caller, target = target_email, "impersonation link generated");
    Ok(link)
}

/// Case-insensitive allow-list membership.
fn is_allow_listed(allow_list: &[String], email: &str) -> bool {
    allow_list.iter().any(|a| a.eq_ignore_ascii_case(email))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_matches_case_insensitively() {
        let allow = vec!["ops@trimly.app".to_string()];
        assert!(is_allow_listed(&allow, "ops@trimly.app"));
        assert!(is_allow_listed(&allow, "OPS@Trimly.App"));
        assert!(!is_allow_listed(&allow, "tenant@shop.test"));
        assert!(!is_allow_listed(&[], "ops@trimly.app"));
    }
}
