//! Inbound payment webhook handling.
//!
//! Signature verification comes first and uses the provider library, never
//! a hand-rolled HMAC. Parsing is pure and precedes any database work, so
//! a malformed event is rejected with no side effect at all. The
//! idempotency insert and the state mutation share one transaction: a
//! redelivered event is acknowledged without reprocessing, and a failed
//! mutation leaves the event unmarked so the provider's retry can land.

use serde_json::Value;
use sqlx::PgPool;
use stripe::WebhookError;
use tracing::{info, warn};
use uuid::Uuid;

use super::{BillingError, PlanMap};
use crate::email::Mailer;
use crate::profiles::queries;

/// Verified, parsed event envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub event_id: String,
    pub kind: EventKind,
}

/// The event shapes this system reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `checkout.session.completed` — the tenant id must ride along as the
    /// client reference; its absence is a hard error, not a silent skip.
    CheckoutCompleted {
        tenant_id: Uuid,
        billing_customer_id: String,
        customer_email: Option<String>,
        customer_name: Option<String>,
        price_id: Option<String>,
    },
    /// `invoice.payment_succeeded` for a subscription cycle.
    RenewalSucceeded { billing_customer_id: String },
    /// `customer.subscription.deleted`.
    SubscriptionCanceled { billing_customer_id: String },
    /// Anything else: acknowledged, not acted on.
    Ignored { event_type: String },
}

/// What happened to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied,
    Duplicate,
    Ignored,
}

/// Verify the provider signature over the raw payload.
///
/// `construct_event` does both verification and typed parsing; only the
/// verification matters here. The envelope is routed by hand below, so a
/// parse failure with a good signature is not an error.
pub fn verify_signature(payload: &str, signature: &str, secret: &str) -> Result<(), BillingError> {
    match stripe::Webhook::construct_event(payload, signature, secret) {
        Ok(_) => Ok(()),
        Err(WebhookError::BadParse(e)) => {
            tracing::debug!(error = %e, "webhook event parsing failed (signature ok)");
            Ok(())
        }
        Err(e) => Err(BillingError::SignatureVerification(e.to_string())),
    }
}

/// The customer reference in webhook payloads is usually a bare id, but
/// may arrive expanded as an object.
fn customer_ref(object: &Value) -> Option<String> {
    let customer = object.get("customer")?;
    if let Some(id) = customer.as_str() {
        return Some(id.to_string());
    }
    customer
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn field_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

/// Parse a verified payload into an [`Envelope`]. Pure: no IO, so the
/// missing-tenant-id rejection provably happens before any database call.
pub fn parse_envelope(payload: &Value) -> Result<Envelope, BillingError> {
    let event_id = field_str(payload, "id")
        .ok_or(BillingError::MissingField("id"))?
        .to_string();
    let event_type = field_str(payload, "type")
        .ok_or(BillingError::MissingField("type"))?
        .to_string();
    let object = payload
        .get("data")
        .and_then(|d| d.get("object"))
        .ok_or(BillingError::MissingField("data.object"))?;

    let kind = match event_type.as_str() {
        "checkout.session.completed" => {
            let reference = field_str(object, "client_reference_id")
                .ok_or(BillingError::MissingField("client_reference_id"))?;
            let tenant_id = Uuid::parse_str(reference)
                .map_err(|_| BillingError::InvalidTenantId(reference.to_string()))?;
            let billing_customer_id =
                customer_ref(object).ok_or(BillingError::MissingField("customer"))?;
            let details = object.get("customer_details");
            EventKind::CheckoutCompleted {
                tenant_id,
                billing_customer_id,
                customer_email: details
                    .and_then(|d| field_str(d, "email"))
                    .map(str::to_string),
                customer_name: details
                    .and_then(|d| field_str(d, "name"))
                    .map(str::to_string),
                price_id: object
                    .get("metadata")
                    .and_then(|m| field_str(m, "price_id"))
                    .map(str::to_string),
            }
        }
        "invoice.payment_succeeded" => {
            let cycle = field_str(object, "billing_reason") == Some("subscription_cycle");
            match (cycle, customer_ref(object)) {
                (true, Some(billing_customer_id)) => {
                    EventKind::RenewalSucceeded { billing_customer_id }
                }
                _ => EventKind::Ignored { event_type },
            }
        }
        "customer.subscription.deleted" => match customer_ref(object) {
            Some(billing_customer_id) => EventKind::SubscriptionCanceled { billing_customer_id },
            None => EventKind::Ignored { event_type },
        },
        _ => EventKind::Ignored { event_type },
    };

    Ok(Envelope { event_id, kind })
}

/// Apply a verified event: idempotency insert plus state mutation in one
/// transaction, welcome email fire-and-forget after commit.
pub async fn apply_event(
    pool: &PgPool,
    plans: &PlanMap,
    mailer: &Mailer,
    payload: &Value,
) -> Result<WebhookOutcome, BillingError> {
    let envelope = parse_envelope(payload)?;

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO processed_webhook_events (id) VALUES ($1) ON CONFLICT (id) DO NOTHING",
    )
    .bind(&envelope.event_id)
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        tx.commit().await?;
        info!(event_id = %envelope.event_id, "duplicate webhook event acknowledged");
        return Ok(WebhookOutcome::Duplicate);
    }

    let mut welcome: Option<(String, String, String)> = None;
    let outcome = match &envelope.kind {
        EventKind::CheckoutCompleted {
            tenant_id,
            billing_customer_id,
            customer_email,
            customer_name,
            price_id,
        } => {
            let plan = plans.resolve(price_id.as_deref()).to_string();
            let updated =
                queries::activate_subscription(&mut *tx, *tenant_id, &plan, billing_customer_id)
                    .await
                    .map_err(profile_db)?;
            if updated == 0 {
                warn!(%tenant_id, "checkout completed for unknown tenant, nothing updated");
            } else {
                info!(%tenant_id, plan = %plan, "subscription activated");
                if let Some(email) = customer_email {
                    welcome = Some((
                        email.clone(),
                        customer_name.clone().unwrap_or_else(|| "there".into()),
                        plan,
                    ));
                }
            }
            WebhookOutcome::Applied
        }
        EventKind::RenewalSucceeded { billing_customer_id } => {
            let updated = queries::record_renewal_by_customer(&mut *tx, billing_customer_id)
                .await
                .map_err(profile_db)?;
            if updated == 0 {
                warn!(customer = %billing_customer_id, "renewal for unknown customer");
            } else {
                info!(customer = %billing_customer_id, "renewal recorded");
            }
            WebhookOutcome::Applied
        }
        EventKind::SubscriptionCanceled { billing_customer_id } => {
            let updated = queries::mark_past_due_by_customer(&mut *tx, billing_customer_id)
                .await
                .map_err(profile_db)?;
            if updated == 0 {
                warn!(
                    customer = %billing_customer_id,
                    "cancellation for unknown customer"
                );
            } else {
                info!(customer = %billing_customer_id, "subscription canceled");
            }
            WebhookOutcome::Applied
        }
        EventKind::Ignored { event_type } => {
            info!(event_type = %event_type, "webhook event ignored");
            WebhookOutcome::Ignored
        }
    };

    tx.commit().await?;

    if let Some((email, name, plan)) = welcome {
        mailer.send_detached(
            email,
            format!("Welcome to Trimly — your {plan} plan is active"),
            format!(
                "<h1>Welcome to Trimly, {name}!</h1>\
                 <p>Your <strong>{plan}</strong> subscription is now active.</p>"
            ),
        );
    }

    Ok(outcome)
}

fn profile_db(e: crate::profiles::ProfileError) -> BillingError {
    match e {
        crate::profiles::ProfileError::Db(e) => BillingError::Db(e),
        other => BillingError::Provider(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use serde_json::json;
    use sha2::Sha256;

    /// Forge a signature the way the provider computes it:
    /// `v1 = HMAC-SHA256(secret, "{timestamp}.{payload}")`.
    fn forge_signature(payload: &str, secret: &str, timestamp: u64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        let digest = mac.finalize().into_bytes();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("t={timestamp},v1={hex}")
    }

    fn unix_now() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_secs()
    }

    #[test]
    fn good_signature_verifies_even_for_unknown_event_shapes() {
        let payload = json!({"id": "evt_x", "type": "customer.updated", "data": {"object": {}}})
            .to_string();
        let sig = forge_signature(&payload, "whsec_test", unix_now());
        assert!(verify_signature(&payload, &sig, "whsec_test").is_ok());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let payload = json!({"id": "evt_x", "type": "customer.updated", "data": {"object": {}}})
            .to_string();
        let sig = forge_signature(&payload, "whsec_test", unix_now());
        let tampered = payload.replace("customer.updated", "checkout.session.completed");
        assert!(matches!(
            verify_signature(&tampered, &sig, "whsec_test"),
            Err(BillingError::SignatureVerification(_))
        ));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let payload = json!({"id": "evt_x", "type": "customer.updated", "data": {"object": {}}})
            .to_string();
        let sig = forge_signature(&payload, "whsec_other", unix_now());
        assert!(matches!(
            verify_signature(&payload, &sig, "whsec_test"),
            Err(BillingError::SignatureVerification(_))
        ));
    }

    fn checkout_payload(client_reference_id: Option<&str>) -> Value {
        let mut object = json!({
            "id": "cs_test_1",
            "customer": "cus_123",
            "customer_details": { "email": "owner@shop.test", "name": "Sam" },
            "metadata": { "price_id": "price_basic" },
        });
        if let Some(id) = client_reference_id {
            object["client_reference_id"] = json!(id);
        }
        json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": object },
        })
    }

    #[test]
    fn checkout_without_tenant_id_is_a_hard_error() {
        let err = parse_envelope(&checkout_payload(None)).unwrap_err();
        assert!(matches!(
            err,
            BillingError::MissingField("client_reference_id")
        ));
    }

    #[test]
    fn checkout_with_malformed_tenant_id_is_rejected() {
        let err = parse_envelope(&checkout_payload(Some("not-a-uuid"))).unwrap_err();
        assert!(matches!(err, BillingError::InvalidTenantId(_)));
    }

    #[test]
    fn checkout_parses_into_activation() {
        let tenant = "7f1a0a10-0000-4000-8000-00000000abcd";
        let envelope = parse_envelope(&checkout_payload(Some(tenant))).expect("envelope");
        assert_eq!(envelope.event_id, "evt_1");
        match envelope.kind {
            EventKind::CheckoutCompleted {
                tenant_id,
                billing_customer_id,
                customer_email,
                price_id,
                ..
            } => {
                assert_eq!(tenant_id, Uuid::parse_str(tenant).unwrap());
                assert_eq!(billing_customer_id, "cus_123");
                assert_eq!(customer_email.as_deref(), Some("owner@shop.test"));
                assert_eq!(price_id.as_deref(), Some("price_basic"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn cancellation_matches_by_customer_reference() {
        let payload = json!({
            "id": "evt_2",
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_1", "customer": "cus_456" } },
        });
        let envelope = parse_envelope(&payload).expect("envelope");
        assert_eq!(
            envelope.kind,
            EventKind::SubscriptionCanceled {
                billing_customer_id: "cus_456".into()
            }
        );
    }

    #[test]
    fn renewal_requires_subscription_cycle_reason() {
        let cycle = json!({
            "id": "evt_3",
            "type": "invoice.payment_succeeded",
            "data": { "object": { "billing_reason": "subscription_cycle", "customer": "cus_789" } },
        });
        assert_eq!(
            parse_envelope(&cycle).unwrap().kind,
            EventKind::RenewalSucceeded {
                billing_customer_id: "cus_789".into()
            }
        );

        let one_off = json!({
            "id": "evt_4",
            "type": "invoice.payment_succeeded",
            "data": { "object": { "billing_reason": "manual", "customer": "cus_789" } },
        });
        assert!(matches!(
            parse_envelope(&one_off).unwrap().kind,
            EventKind::Ignored { .. }
        ));
    }

    #[test]
    fn expanded_customer_objects_are_accepted() {
        let payload = json!({
            "id": "evt_5",
            "type": "customer.subscription.deleted",
            "data": { "object": { "customer": { "id": "cus_exp" } } },
        });
        assert_eq!(
            parse_envelope(&payload).unwrap().kind,
            EventKind::SubscriptionCanceled {
                billing_customer_id: "cus_exp".into()
            }
        );
    }

    #[test]
    fn unhandled_event_types_are_ignored() {
        let payload = json!({
            "id": "evt_6",
            "type": "customer.updated",
            "data": { "object": {} },
        });
        assert!(matches!(
            parse_envelope(&payload).unwrap().kind,
            EventKind::Ignored { .. }
        ));
    }

    #[test]
    fn missing_envelope_fields_are_rejected() {
        assert!(matches!(
            parse_envelope(&json!({ "type": "x", "data": { "object": {} } })).unwrap_err(),
            BillingError::MissingField("id")
        ));
        assert!(matches!(
            parse_envelope(&json!({ "id": "evt", "data": { "object": {} } })).unwrap_err(),
            BillingError::MissingField("type")
        ));
        assert!(matches!(
            parse_envelope(&json!({ "id": "evt", "type": "x" })).unwrap_err(),
            BillingError::MissingField("data.object")
        ));
    }
}
