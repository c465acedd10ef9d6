//! REST client for the identity provider.
//!
//! Endpoint shapes follow the GoTrue-style API: token grants on one
//! endpoint discriminated by `grant_type`, OTP verification, and a
//! privileged admin surface for one-time sign-in links.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::IdentityError;
use crate::models::session::SessionTokens;

/// Client for the identity provider's REST API.
///
/// `anon_key` authenticates public endpoints; `service_key` is required for
/// the admin surface and must never reach a client.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

/// Error body shape the provider returns on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(alias = "error_description", alias = "msg", alias = "message")]
    error: Option<String>,
}

/// Response of the admin link-generation endpoint.
#[derive(Debug, Deserialize)]
struct GenerateLinkResponse {
    action_link: Option<String>,
}

impl IdentityClient {
    /// Build a client for the provider rooted at `base_url` (the auth API
    /// root, e.g. `https://id.example.com/auth/v1`).
    pub fn new(base_url: Url, anon_key: String, service_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            anon_key,
            service_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<SessionTokens, IdentityError> {
        let url = format!("{}?grant_type={grant_type}", self.endpoint("token"));
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;
        Self::parse_session(resp).await
    }

    async fn parse_session(resp: reqwest::Response) -> Result<SessionTokens, IdentityError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::rejected(status.as_u16(), resp).await);
        }
        Ok(resp.json::<SessionTokens>().await?)
    }

    async fn rejected(status: u16, resp: reqwest::Response) -> IdentityError {
        let message = match resp.json::<ProviderError>().await {
            Ok(body) => body.error.unwrap_or_else(|| "unknown error".into()),
            Err(_) => "unknown error".into(),
        };
        debug!(status, %message, "identity provider rejected request");
        IdentityError::Rejected { status, message }
    }

    /// Password grant.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionTokens, IdentityError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    /// Exchange a one-time auth code from the email-confirmation / OAuth
    /// callback for a session.
    pub async fn exchange_code(&self, code: &str) -> Result<SessionTokens, IdentityError> {
        self.token_grant("pkce", json!({ "auth_code": code })).await
    }

    /// Exchange a refresh token for a fresh token pair.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<SessionTokens, IdentityError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    /// Verify an emailed OTP (`token_hash` link), producing a session.
    pub async fn verify_otp(
        &self,
        otp_type: &str,
        token_hash: &str,
    ) -> Result<SessionTokens, IdentityError> {
        let resp = self
            .http
            .post(self.endpoint("verify"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "type": otp_type, "token_hash": token_hash }))
            .send()
            .await?;
        Self::parse_session(resp).await
    }

    /// Register a new account. The provider emails a confirmation link
    /// pointing back at `redirect_to`; no session is issued yet.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        shop_name: Option<&str>,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        let resp = self
            .http
            .post(self.endpoint("signup"))
            .query(&[("redirect_to", redirect_to)])
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "shop_name": shop_name },
            }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::rejected(status.as_u16(), resp).await);
        }
        Ok(())
    }

    /// Request a password-recovery email.
    pub async fn recover(&self, email: &str, redirect_to: &str) -> Result<(), IdentityError> {
        let resp = self
            .http
            .post(self.endpoint("recover"))
            .query(&[("redirect_to", redirect_to)])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::rejected(status.as_u16(), resp).await);
        }
        Ok(())
    }

    /// Revoke the session behind `access_token`. Best-effort: logout always
    /// clears the local cookies regardless.
    pub async fn logout(&self, access_token: &str) -> Result<(), IdentityError> {
        let resp = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::rejected(status.as_u16(), resp).await);
        }
        Ok(())
    }

    /// Generate a one-time sign-in link for `email` via the admin surface.
    /// Requires the service key; callers gate this behind the allow-list
    /// and rate limiter.
    pub async fn generate_magic_link(&self, email: &str) -> Result<String, IdentityError> {
        let resp = self
            .http
            .post(self.endpoint("admin/generate_link"))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({ "type": "magiclink", "email": email }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::rejected(status.as_u16(), resp).await);
        }
        let body = resp.json::<GenerateLinkResponse>().await?;
        body.action_link
            .ok_or(IdentityError::MissingField("action_link"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_without_double_slashes() {
        let client = IdentityClient::new(
            Url::parse("https://id.example.com/auth/v1/").expect("url"),
            "anon".into(),
            "service".into(),
        );
        assert_eq!(
            client.endpoint("token"),
            "https://id.example.com/auth/v1/token"
        );
        assert_eq!(
            client.endpoint("admin/generate_link"),
            "https://id.example.com/auth/v1/admin/generate_link"
        );
    }
}
