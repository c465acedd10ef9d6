//! Identity provider integration.
//!
//! Sessions are issued by an external identity service; this module
//! verifies its JWTs locally (shared HS256 secret) and talks to its REST
//! API for everything else: credential exchange, refresh, signup, logout
//! and admin one-time links.

pub mod client;
pub mod jwt;

use thiserror::Error;

/// Identity provider errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("identity response missing field: {0}")]
    MissingField(&'static str),
}
