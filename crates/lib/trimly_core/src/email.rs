//! Outbound transactional email.
//!
//! Thin JSON client for the email provider's send endpoint. Sends from the
//! webhook path are fire-and-forget so a slow provider never blocks the
//! payment provider's delivery timeout.

use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Email provider send endpoint.
const SEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Email sending errors.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email provider rejected the request ({status})")]
    Rejected { status: u16 },
}

/// Client for the email provider.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
        }
    }

    /// Send one HTML email.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let resp = self
            .http
            .post(SEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EmailError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Send without awaiting the outcome; failures are logged only.
    pub fn send_detached(&self, to: String, subject: String, html: String) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &html).await {
                warn!(error = %e, to = %to, "detached email send failed");
            }
        });
    }
}
