//! Impersonation rate limiter.
//!
//! One record per caller network address: an attempt counter and the
//! timestamp of the attempt that opened the window. Garbage collection
//! happens on read (an expired record is deleted, never zeroed), and the
//! increment is a single upsert-returning statement, so concurrent
//! attempts from one address cannot race past the threshold.
//!
//! The counter moves on every attempt, not only failed ones: a legitimate
//! admin exhausts their own quota after [`MAX_ATTEMPTS`] uses per window.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;

/// Attempts allowed per address per window.
pub const MAX_ATTEMPTS: i32 = 5;

/// Window length in minutes, anchored at the first attempt.
pub const WINDOW_MINUTES: i64 = 15;

/// Rate limiter persistence errors.
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDecision {
    /// Attempt `number` of [`MAX_ATTEMPTS`] in the current window.
    Allowed { number: i32 },
    Limited,
}

/// Whether a window that opened at `window_started_at` has elapsed at `now`.
pub fn window_expired(window_started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - window_started_at > Duration::minutes(WINDOW_MINUTES)
}

/// Classify the post-increment counter value.
pub fn decide_attempt(attempts: i32) -> AttemptDecision {
    if attempts > MAX_ATTEMPTS {
        AttemptDecision::Limited
    } else {
        AttemptDecision::Allowed { number: attempts }
    }
}

/// Register one attempt from `address` and decide it.
///
/// Order matters: expired windows for this address are collected first,
/// then the counter is atomically incremented (or a fresh window opened)
/// and the new value checked. `window_started_at` is set on insert and
/// never advanced, so a denied attempt inside a window does not extend it.
pub async fn register_attempt(
    pool: &PgPool,
    address: &str,
) -> Result<AttemptDecision, RateLimitError> {
    sqlx::query(
        "DELETE FROM impersonation_attempts \
         WHERE address = $1 AND window_started_at < now() - interval '15 minutes'",
    )
    .bind(address)
    .execute(pool)
    .await?;

    let attempts = sqlx::query_scalar::<_, i32>(
        "INSERT INTO impersonation_attempts (address) VALUES ($1) \
         ON CONFLICT (address) DO UPDATE \
             SET attempts = impersonation_attempts.attempts + 1, last_attempt_at = now() \
         RETURNING attempts",
    )
    .bind(address)
    .fetch_one(pool)
    .await?;

    Ok(decide_attempt(attempts))
}
