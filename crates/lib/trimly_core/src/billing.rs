//! Payment provider integration: inbound webhook events and the outbound
//! billing portal.

pub mod portal;
pub mod webhook;

use thiserror::Error;

/// Billing errors.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("webhook signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("webhook event missing field: {0}")]
    MissingField(&'static str),

    #[error("webhook event carries an invalid tenant id: {0}")]
    InvalidTenantId(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("payment provider error: {0}")]
    Provider(String),
}

/// Price-id to plan-name mapping, from configuration.
#[derive(Debug, Clone, Default)]
pub struct PlanMap {
    entries: Vec<(String, String)>,
}

impl PlanMap {
    /// Plan assumed when an event carries no recognizable price id.
    pub const DEFAULT_PLAN: &'static str = "professional";

    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Resolve a price id to its plan name, falling back to
    /// [`Self::DEFAULT_PLAN`].
    pub fn resolve(&self, price_id: Option<&str>) -> &str {
        price_id
            .and_then(|id| {
                self.entries
                    .iter()
                    .find(|(price, _)| price == id)
                    .map(|(_, plan)| plan.as_str())
            })
            .unwrap_or(Self::DEFAULT_PLAN)
    }
}
