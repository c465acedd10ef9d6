//! API request/response models.
//!
//! Wire DTOs, camelCase on the wire; distinct from the domain models in
//! `trimly_core::models`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trimly_core::models::profile::SubscriptionStatus;

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Generic success acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub shop_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: AuthUser,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub status: SubscriptionStatus,
    /// Days left in the trial; zero outside the trial tier.
    pub days_remaining: i64,
    /// Whether the profile has a phone number on file.
    pub profile_complete: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClosingDatesRequest {
    /// ISO dates (`YYYY-MM-DD`) to close.
    pub dates: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClosingDatesResponse {
    pub success: bool,
    /// The merged, deduplicated, chronologically ordered set.
    pub dates: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PortalResponse {
    pub url: String,
}

/// Impersonation form body.
#[derive(Debug, Deserialize)]
pub struct ImpersonateForm {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImpersonateResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    pub shop_name: Option<String>,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfilesResponse {
    pub profiles: Vec<ProfileEntry>,
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceivedResponse {
    pub received: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub db_connected: bool,
}
