//! Profile database queries.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::ProfileError;
use crate::models::profile::{
    Entitlement, ProfileListing, SubscriptionOverview, SubscriptionStatus,
};

/// Create the tenant's profile row if it does not exist yet. Called on
/// every successful session acquisition, so it must be a no-op for
/// returning tenants.
pub async fn ensure_profile(
    pool: &PgPool,
    tenant_id: Uuid,
    email: &str,
    shop_name: Option<&str>,
) -> Result<(), ProfileError> {
    sqlx::query(
        "INSERT INTO account_profiles (id, email, shop_name) VALUES ($1, $2, $3) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(tenant_id)
    .bind(email)
    .bind(shop_name)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch the entitlement slice the gate classifies on.
pub async fn entitlement(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Option<Entitlement>, ProfileError> {
    let row = sqlx::query_as::<_, (String, DateTime<Utc>)>(
        "SELECT subscription_status::text, trial_started_at FROM account_profiles WHERE id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;
    row.map(|(status, trial_started_at)| {
        Ok(Entitlement {
            status: SubscriptionStatus::parse(&status)
                .ok_or(ProfileError::UnknownStatus(status))?,
            trial_started_at,
        })
    })
    .transpose()
}

/// Fetch the subscription overview for the self-service endpoint.
pub async fn subscription_overview(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Option<SubscriptionOverview>, ProfileError> {
    let row = sqlx::query_as::<_, (String, DateTime<Utc>, Option<String>)>(
        "SELECT subscription_status::text, trial_started_at, phone \
         FROM account_profiles WHERE id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;
    row.map(|(status, trial_started_at, phone)| {
        Ok(SubscriptionOverview {
            status: SubscriptionStatus::parse(&status)
                .ok_or(ProfileError::UnknownStatus(status))?,
            trial_started_at,
            phone,
        })
    })
    .transpose()
}

/// Billing-customer reference on file, if any.
pub async fn billing_customer_id(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Option<String>, ProfileError> {
    let row = sqlx::query_scalar::<_, Option<String>>(
        "SELECT billing_customer_id FROM account_profiles WHERE id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.flatten())
}

/// Checkout completed: mark the tenant active and record plan, billing
/// customer and payment time. Set semantics keyed by tenant id, so a
/// redelivered event is a safe overwrite. Returns affected rows.
pub async fn activate_subscription(
    conn: &mut sqlx::PgConnection,
    tenant_id: Uuid,
    plan: &str,
    billing_customer_id: &str,
) -> Result<u64, ProfileError> {
    let result = sqlx::query(
        "UPDATE account_profiles \
         SET subscription_status = 'active', plan = $2, billing_customer_id = $3, \
             last_payment_at = now() \
         WHERE id = $1",
    )
    .bind(tenant_id)
    .bind(plan)
    .bind(billing_customer_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Renewal payment: refresh the payment timestamp and keep the tenant
/// active, matched by billing-customer reference.
pub async fn record_renewal_by_customer(
    conn: &mut sqlx::PgConnection,
    billing_customer_id: &str,
) -> Result<u64, ProfileError> {
    let result = sqlx::query(
        "UPDATE account_profiles \
         SET subscription_status = 'active', last_payment_at = now() \
         WHERE billing_customer_id = $1",
    )
    .bind(billing_customer_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Subscription canceled upstream: the tenant drops to past_due until a
/// new successful-payment event arrives.
pub async fn mark_past_due_by_customer(
    conn: &mut sqlx::PgConnection,
    billing_customer_id: &str,
) -> Result<u64, ProfileError> {
    let result = sqlx::query(
        "UPDATE account_profiles SET subscription_status = 'past_due' \
         WHERE billing_customer_id = $1",
    )
    .bind(billing_customer_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Merge `dates` into the tenant's closed-dates set (dedup, chronological
/// order) and mark the calendar confirmed. Returns the merged set.
pub async fn merge_closing_dates(
    pool: &PgPool,
    tenant_id: Uuid,
    dates: &[String],
) -> Result<Vec<String>, ProfileError> {
    let existing = sqlx::query_scalar::<_, Vec<String>>(
        "SELECT closed_dates FROM account_profiles WHERE id = $1",
    )
    .bind(tenant_id)
    .fetch_one(pool)
    .await?;

    let merged: BTreeSet<String> = existing
        .into_iter()
        .chain(dates.iter().cloned())
        .collect();
    let merged: Vec<String> = merged.into_iter().collect();

    sqlx::query(
        "UPDATE account_profiles SET closed_dates = $2, calendar_confirmed = true \
         WHERE id = $1",
    )
    .bind(tenant_id)
    .bind(&merged)
    .execute(pool)
    .await?;

    Ok(merged)
}

/// Shop name + email listing for the support UI.
pub async fn list_profiles(pool: &PgPool) -> Result<Vec<ProfileListing>, ProfileError> {
    let rows = sqlx::query_as::<_, (Option<String>, String)>(
        "SELECT shop_name, email FROM account_profiles ORDER BY shop_name NULLS LAST, email",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(shop_name, email)| ProfileListing { shop_name, email })
        .collect())
}
