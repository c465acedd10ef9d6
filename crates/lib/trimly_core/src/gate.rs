//! Session & entitlement gate policy.
//!
//! Pure decision logic: given the deployment environment, the requested
//! path and the resolved session state, decide whether a request proceeds,
//! is redirected, or is denied. Credential resolution and profile lookups
//! happen in the HTTP layer; nothing here does IO.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::profile::{Entitlement, SubscriptionStatus};

/// Length of the free trial, in days.
pub const TRIAL_DAYS: i64 = 7;

/// Deployment environment. Gates the admin namespace: `/admin` paths are
/// denied outright in production, regardless of credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse from `APP_ENV`-style strings. Anything that is not a production
    /// spelling is treated as development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

/// Gate configuration, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct GatePolicy {
    pub environment: Environment,
    /// When off (the deployed default), unauthenticated requests to
    /// protected pages pass through and the client surface handles login.
    /// When on, they are redirected to the login page. Deliberate
    /// configuration, not a hardcoded branch.
    pub enforce_auth: bool,
}

/// Outcome of the gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectToHome,
    Deny,
}

/// Access tier of the caller, classified from session plus account profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "tier")]
pub enum AccessTier {
    Anonymous,
    Trial { days_remaining: i64 },
    Subscribed,
    Expired,
    Admin,
}

/// Paths reachable without any session: the public root, the auth flow and
/// the marketing pages around it.
pub fn is_public_path(path: &str) -> bool {
    matches!(path, "/" | "/login" | "/register" | "/pricing" | "/favicon.ico")
        || path.starts_with("/auth/")
}

/// The admin namespace.
pub fn is_admin_path(path: &str) -> bool {
    path == "/admin" || path.starts_with("/admin/")
}

/// API paths are never redirected; their handlers answer 401 themselves,
/// and the webhook endpoint authenticates by signature instead of session.
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Protected pages are the ones whose gate decision may depend on the
/// caller's entitlement (everything that is not public, admin or API).
pub fn needs_entitlement(path: &str) -> bool {
    !is_public_path(path) && !is_admin_path(path) && !is_api_path(path)
}

/// Whether the admin lockout applies, independent of any credential.
pub fn admin_locked_out(environment: Environment, path: &str) -> bool {
    is_admin_path(path) && environment == Environment::Production
}

/// The gate decision for one request.
///
/// `has_session` is the result of credential resolution (including the
/// transparent refresh); `tier` is the caller's classified tier, looked up
/// only for protected pages with a session.
pub fn decide(
    policy: &GatePolicy,
    path: &str,
    has_session: bool,
    tier: Option<AccessTier>,
) -> RouteDecision {
    if is_admin_path(path) {
        if policy.environment == Environment::Production {
            return RouteDecision::Deny;
        }
        // Development: the impersonation handlers enforce the allow-list.
        return RouteDecision::Allow;
    }

    if is_public_path(path) || is_api_path(path) {
        return RouteDecision::Allow;
    }

    if !has_session {
        return if policy.enforce_auth {
            RouteDecision::RedirectToLogin
        } else {
            RouteDecision::Allow
        };
    }

    match tier {
        // The paywall lives on the public root.
        Some(AccessTier::Expired) => RouteDecision::RedirectToHome,
        _ => RouteDecision::Allow,
    }
}

/// Classify a tenant's tier from its profile.
///
/// `active` means subscribed; `past_due`/`canceled` are only cleared by a
/// new successful-payment event, so they classify as expired no matter how
/// old the trial is. A `trial` profile is time-checked against
/// [`TRIAL_DAYS`].
pub fn classify_tier(entitlement: &Entitlement, now: DateTime<Utc>) -> AccessTier {
    match entitlement.status {
        SubscriptionStatus::Active => AccessTier::Subscribed,
        SubscriptionStatus::PastDue | SubscriptionStatus::Canceled => AccessTier::Expired,
        SubscriptionStatus::Trial => {
            let days_passed = (now - entitlement.trial_started_at).num_days();
            if days_passed < TRIAL_DAYS {
                AccessTier::Trial {
                    days_remaining: TRIAL_DAYS - days_passed,
                }
            } else {
                AccessTier::Expired
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy(environment: Environment, enforce_auth: bool) -> GatePolicy {
        GatePolicy {
            environment,
            enforce_auth,
        }
    }

    fn trial_entitlement(started_days_ago: i64, now: DateTime<Utc>) -> Entitlement {
        Entitlement {
            status: SubscriptionStatus::Trial,
            trial_started_at: now - Duration::days(started_days_ago),
        }
    }

    #[test]
    fn admin_paths_denied_in_production_regardless_of_session() {
        let p = policy(Environment::Production, true);
        for (has_session, tier) in [
            (false, None),
            (true, None),
            (true, Some(AccessTier::Subscribed)),
            (true, Some(AccessTier::Admin)),
        ] {
            assert_eq!(
                decide(&p, "/admin/impersonate", has_session, tier),
                RouteDecision::Deny
            );
        }
        assert!(admin_locked_out(Environment::Production, "/admin"));
        assert!(!admin_locked_out(Environment::Development, "/admin"));
    }

    #[test]
    fn admin_paths_pass_the_gate_in_development() {
        let p = policy(Environment::Development, true);
        assert_eq!(
            decide(&p, "/admin/profiles", false, None),
            RouteDecision::Allow
        );
    }

    #[test]
    fn public_and_auth_paths_allow_anonymous() {
        let p = policy(Environment::Production, true);
        for path in ["/", "/login", "/register", "/pricing", "/auth/callback"] {
            assert_eq!(decide(&p, path, false, None), RouteDecision::Allow, "{path}");
        }
    }

    #[test]
    fn protected_page_without_session_redirects_only_when_enforced() {
        let enforced = policy(Environment::Development, true);
        let lenient = policy(Environment::Development, false);
        assert_eq!(
            decide(&enforced, "/dashboard", false, None),
            RouteDecision::RedirectToLogin
        );
        assert_eq!(
            decide(&lenient, "/dashboard", false, None),
            RouteDecision::Allow
        );
    }

    #[test]
    fn api_paths_are_never_redirected() {
        let p = policy(Environment::Development, true);
        assert_eq!(
            decide(&p, "/api/billing/portal", false, None),
            RouteDecision::Allow
        );
        assert_eq!(
            decide(&p, "/api/webhooks/stripe", false, None),
            RouteDecision::Allow
        );
    }

    #[test]
    fn expired_tenant_is_sent_to_the_paywall() {
        let p = policy(Environment::Development, false);
        assert_eq!(
            decide(&p, "/dashboard", true, Some(AccessTier::Expired)),
            RouteDecision::RedirectToHome
        );
        assert_eq!(
            decide(&p, "/dashboard", true, Some(AccessTier::Subscribed)),
            RouteDecision::Allow
        );
        // Allow-listed admins bypass the paywall.
        assert_eq!(
            decide(&p, "/dashboard", true, Some(AccessTier::Admin)),
            RouteDecision::Allow
        );
    }

    #[test]
    fn tier_classification_follows_subscription_state() {
        let now = Utc::now();

        let active = Entitlement {
            status: SubscriptionStatus::Active,
            trial_started_at: now - Duration::days(400),
        };
        assert_eq!(classify_tier(&active, now), AccessTier::Subscribed);

        let past_due = Entitlement {
            status: SubscriptionStatus::PastDue,
            trial_started_at: now,
        };
        assert_eq!(classify_tier(&past_due, now), AccessTier::Expired);

        let canceled = Entitlement {
            status: SubscriptionStatus::Canceled,
            trial_started_at: now,
        };
        assert_eq!(classify_tier(&canceled, now), AccessTier::Expired);
    }

    #[test]
    fn trial_tier_counts_down_and_expires() {
        let now = Utc::now();
        assert_eq!(
            classify_tier(&trial_entitlement(0, now), now),
            AccessTier::Trial { days_remaining: 7 }
        );
        assert_eq!(
            classify_tier(&trial_entitlement(3, now), now),
            AccessTier::Trial { days_remaining: 4 }
        );
        assert_eq!(
            classify_tier(&trial_entitlement(6, now), now),
            AccessTier::Trial { days_remaining: 1 }
        );
        assert_eq!(
            classify_tier(&trial_entitlement(7, now), now),
            AccessTier::Expired
        );
        assert_eq!(
            classify_tier(&trial_entitlement(30, now), now),
            AccessTier::Expired
        );
    }

    #[test]
    fn environment_parses_loosely() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("PROD"), Environment::Production);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse(""), Environment::Development);
    }
}
