//! Billing portal session creation.

use stripe::{BillingPortalSession, Client, CreateBillingPortalSession, CustomerId};
use tracing::info;

use super::BillingError;

/// Create a billing-portal session for the tenant's stored customer
/// reference and return its redirect URL.
pub async fn create_portal_session(
    secret_key: &str,
    billing_customer_id: &str,
    return_url: &str,
) -> Result<String, BillingError> {
    let customer: CustomerId = billing_customer_id
        .parse()
        .map_err(|_| BillingError::Provider("invalid billing customer id".into()))?;

    let client = Client::new(secret_key);
    let mut params = CreateBillingPortalSession::new(customer);
    params.return_url = Some(return_url);

    let session = BillingPortalSession::create(&client, params)
        .await
        .map_err(|e| BillingError::Provider(e.to_string()))?;

    info!(session_id = %session.id, "billing portal session created");
    Ok(session.url)
}
