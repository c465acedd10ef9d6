//! Account profile domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription state of a tenant. Stored as the `subscription_status`
/// Postgres enum; transitions are driven by payment-provider events only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Parse the database representation. Unknown values are an error so a
    /// schema drift surfaces instead of silently granting access.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trial" => Some(SubscriptionStatus::Trial),
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

/// The slice of a profile the gate needs to classify an access tier.
#[derive(Debug, Clone)]
pub struct Entitlement {
    pub status: SubscriptionStatus,
    pub trial_started_at: DateTime<Utc>,
}

/// Subscription overview for the tenant self-service endpoint.
#[derive(Debug, Clone)]
pub struct SubscriptionOverview {
    pub status: SubscriptionStatus,
    pub trial_started_at: DateTime<Utc>,
    pub phone: Option<String>,
}

/// Directory entry for the support listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileListing {
    pub shop_name: Option<String>,
    pub email: String,
}

/// Full tenant profile row.
#[derive(Debug, Clone)]
pub struct AccountProfile {
    pub id: Uuid,
    pub email: String,
    pub shop_name: Option<String>,
    pub phone: Option<String>,
    pub plan: Option<String>,
    pub status: SubscriptionStatus,
    pub trial_started_at: DateTime<Utc>,
    pub billing_customer_id: Option<String>,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub closed_dates: Vec<String>,
    pub calendar_confirmed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_representation() {
        for status in [
            SubscriptionStatus::Trial,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubscriptionStatus::parse("pagado"), None);
    }
}
