//! Application error types.
//!
//! The taxonomy mirrors the gate's contract: authentication and
//! authorization resolve at the gate, upstream verification failures
//! short-circuit before mutation, and persistence failures surface as
//! server errors so the payment provider redelivers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use trimly_core::billing::BillingError;
use trimly_core::identity::IdentityError;
use trimly_core::impersonate::ImpersonateError;
use trimly_core::profiles::ProfileError;
use trimly_core::ratelimit::RateLimitError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Upstream verification failed: {0}")]
    UpstreamVerificationFailed(String),

    #[error("Upstream event missing field: {0}")]
    UpstreamMissingField(String),

    #[error("Persistence failed")]
    PersistenceFailed(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Unauthenticated(m) => {
                (StatusCode::UNAUTHORIZED, "unauthenticated", m.as_str())
            }
            AppError::Unauthorized(m) => (StatusCode::FORBIDDEN, "unauthorized", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::RateLimited(m) => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited", m.as_str())
            }
            AppError::UpstreamVerificationFailed(m) => (
                StatusCode::BAD_REQUEST,
                "upstream_verification_failed",
                m.as_str(),
            ),
            AppError::UpstreamMissingField(m) => (
                StatusCode::BAD_REQUEST,
                "upstream_missing_field",
                m.as_str(),
            ),
            AppError::PersistenceFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "persistence_failed",
                "Persistence failed",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            _ => AppError::PersistenceFailed(e.to_string()),
        }
    }
}

impl From<ProfileError> for AppError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::Db(e) => AppError::from(e),
            ProfileError::UnknownStatus(s) => {
                AppError::Internal(format!("unknown subscription status: {s}"))
            }
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Rejected { status, message } => match status {
                401 | 403 => AppError::Unauthenticated(message),
                400 | 422 => AppError::Validation(message),
                _ => AppError::Internal(message),
            },
            IdentityError::Http(e) => AppError::Internal(e.to_string()),
            IdentityError::MissingField(f) => {
                AppError::Internal(format!("identity response missing {f}"))
            }
        }
    }
}

impl From<BillingError> for AppError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::SignatureVerification(m) => AppError::UpstreamVerificationFailed(m),
            BillingError::MissingField(f) => AppError::UpstreamMissingField(f.to_string()),
            BillingError::InvalidTenantId(v) => {
                AppError::UpstreamMissingField(format!("invalid tenant id: {v}"))
            }
            BillingError::Db(e) => AppError::from(e),
            BillingError::Provider(m) => AppError::Internal(m),
        }
    }
}

impl From<RateLimitError> for AppError {
    fn from(e: RateLimitError) -> Self {
        match e {
            RateLimitError::Db(e) => AppError::from(e),
        }
    }
}

impl From<ImpersonateError> for AppError {
    fn from(e: ImpersonateError) -> Self {
        match e {
            ImpersonateError::RateLimited => {
                AppError::RateLimited("too many impersonation attempts".into())
            }
            ImpersonateError::NotAllowed => {
                AppError::Unauthorized("caller is not on the admin allow-list".into())
            }
            ImpersonateError::RateLimit(e) => AppError::from(e),
            ImpersonateError::Identity(e) => AppError::from(e),
        }
    }
}
