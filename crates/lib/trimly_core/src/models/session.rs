//! Session credential models.
//!
//! Sessions are owned by the external identity provider; this system only
//! verifies, forwards and refreshes them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims consumed from the provider-issued session JWT. The token carries
/// more; only these attributes participate in gate decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject — tenant id at the identity provider.
    pub sub: String,
    /// Authenticated email.
    pub email: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Token pair returned by the provider on login, code exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: SessionUser,
}

/// Provider user record embedded in token responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<UserMetadata>,
}

/// Signup metadata this system attaches and reads back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub shop_name: Option<String>,
}

impl SessionUser {
    /// Shop name captured at signup, if any.
    pub fn shop_name(&self) -> Option<&str> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.shop_name.as_deref())
    }
}
