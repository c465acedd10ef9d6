//! Tenant account profiles.
//!
//! One row per barbershop tenant, keyed by the identity provider's subject
//! id. Subscription state only moves on payment-provider events; tenant
//! self-service touches the calendar fields.

pub mod queries;

use thiserror::Error;

/// Profile persistence errors.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("profile row carries an unknown subscription status: {0}")]
    UnknownStatus(String),
}
