//! API server configuration.
//!
//! Provider credentials are required: a missing secret fails startup with
//! a named error instead of degrading at the first request.

use thiserror::Error;
use url::Url;

use trimly_core::billing::PlanMap;
use trimly_core::gate::Environment;

/// Configuration errors, surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("environment variable {var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Public base URL of this deployment, used in redirect targets.
    pub base_url: String,
    /// Deployment environment; gates the `/admin` namespace.
    pub environment: Environment,
    /// Redirect unauthenticated page requests to `/login`. Off by default.
    pub enforce_auth: bool,
    /// Emails allowed to use the impersonation endpoint.
    pub admin_emails: Vec<String>,
    /// Identity provider auth API root.
    pub identity_url: Url,
    /// Identity provider public API key.
    pub identity_anon_key: String,
    /// Shared secret the provider signs session JWTs with.
    pub identity_jwt_secret: String,
    /// Identity provider service key (admin surface only).
    pub identity_service_key: String,
    /// Payment provider secret key.
    pub stripe_secret_key: String,
    /// Payment provider webhook signing secret.
    pub stripe_webhook_secret: String,
    /// Email provider API key.
    pub resend_api_key: String,
    /// From address for outbound email.
    pub email_from: String,
    /// Price-id to plan-name mapping.
    pub plans: PlanMap,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable | Required | Default |
    /// |---|---|---|
    /// | `BASE_URL` | no | `http://localhost:8080` |
    /// | `APP_ENV` | no | `development` |
    /// | `ENFORCE_AUTH` | no | `false` |
    /// | `ADMIN_EMAILS` | no | empty |
    /// | `IDENTITY_URL` | yes | — |
    /// | `IDENTITY_ANON_KEY` | yes | — |
    /// | `IDENTITY_JWT_SECRET` | yes | — |
    /// | `IDENTITY_SERVICE_KEY` | yes | — |
    /// | `STRIPE_SECRET_KEY` | yes | — |
    /// | `STRIPE_WEBHOOK_SECRET` | yes | — |
    /// | `RESEND_API_KEY` | yes | — |
    /// | `EMAIL_FROM` | no | `Trimly <no-reply@trimly.app>` |
    /// | `STRIPE_PRICE_BASIC` / `_PROFESSIONAL` / `_PREMIUM` | no | unset |
    pub fn from_env(bind_addr: String, database_url: String) -> Result<Self, ConfigError> {
        let identity_url = required("IDENTITY_URL")?;
        let identity_url = Url::parse(&identity_url).map_err(|source| ConfigError::InvalidUrl {
            var: "IDENTITY_URL",
            source,
        })?;

        Ok(Self {
            bind_addr,
            database_url,
            base_url: optional("BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".into()),
            environment: Environment::parse(&optional("APP_ENV").unwrap_or_default()),
            enforce_auth: parse_bool(optional("ENFORCE_AUTH").as_deref()),
            admin_emails: parse_admin_emails(&optional("ADMIN_EMAILS").unwrap_or_default()),
            identity_url,
            identity_anon_key: required("IDENTITY_ANON_KEY")?,
            identity_jwt_secret: required("IDENTITY_JWT_SECRET")?,
            identity_service_key: required("IDENTITY_SERVICE_KEY")?,
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            resend_api_key: required("RESEND_API_KEY")?,
            email_from: optional("EMAIL_FROM")
                .unwrap_or_else(|| "Trimly <no-reply@trimly.app>".into()),
            plans: plan_map_from_env(),
        })
    }

    /// Whether `email` is on the admin allow-list.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|a| a.eq_ignore_ascii_case(email))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}

/// Comma-separated allow-list, trimmed, empties dropped.
fn parse_admin_emails(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn plan_map_from_env() -> PlanMap {
    let mut entries = Vec::new();
    for (var, plan) in [
        ("STRIPE_PRICE_BASIC", "basic"),
        ("STRIPE_PRICE_PROFESSIONAL", "professional"),
        ("STRIPE_PRICE_PREMIUM", "premium"),
    ] {
        if let Some(price_id) = optional(var) {
            entries.push((price_id, plan.to_string()));
        }
    }
    PlanMap::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_emails_parse_and_trim() {
        assert_eq!(
            parse_admin_emails(" a@x.com, b@y.com ,, "),
            vec!["a@x.com".to_string(), "b@y.com".to_string()]
        );
        assert!(parse_admin_emails("").is_empty());
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        assert!(parse_bool(Some("true")));
        assert!(parse_bool(Some("1")));
        assert!(parse_bool(Some("Yes")));
        assert!(!parse_bool(Some("false")));
        assert!(!parse_bool(Some("")));
        assert!(!parse_bool(None));
    }
}
