//! Session and profile data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a session came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    /// Freshly issued by the identity provider on sign-in or sign-up
    Issued,
    /// Restored from local storage or the cookie mirror
    Restored,
    /// Produced by a refresh-token exchange
    Refreshed,
}

/// An authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Bearer token for API calls
    pub access_token: String,
    /// Token used to mint a new access token after expiry
    pub refresh_token: String,
    /// User ID from the identity provider
    pub user_id: String,
    /// User email
    pub email: String,
    /// When the access token expires (Unix seconds)
    pub expires_at: i64,
    /// Where this session came from
    #[serde(default = "default_source")]
    pub source: SessionSource,
}

fn default_source() -> SessionSource {
    SessionSource::Restored
}

impl Session {
    /// Whether the access token is expired or about to expire.
    /// A 60-second leeway avoids using a token that dies mid-request.
    pub fn is_expired(&self) -> bool {
        self.expires_at - Utc::now().timestamp() < 60
    }
}

/// A user profile row from the profiles table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Primary key, equal to the auth user ID
    pub id: String,
    /// User email
    pub email: String,
    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Company name
    #[serde(default)]
    pub company: Option<String>,
    /// Subscription plan ("free", "starter", "pro")
    pub plan: String,
    /// When the current plan period ends
    pub plan_expiry: DateTime<Utc>,
    /// Remaining email-finding credits
    pub credits_find: i64,
    /// Remaining email-verification credits
    pub credits_verify: i64,
}

impl UserProfile {
    /// Build the default profile for a newly registered user: the free
    /// plan with a 3-day trial period and 25 credits of each kind.
    pub fn new_free(user_id: &str, email: &str, full_name: Option<&str>) -> Self {
        Self {
            id: user_id.to_string(),
            email: email.to_string(),
            full_name: full_name.map(String::from),
            company: None,
            plan: "free".to_string(),
            plan_expiry: Utc::now() + chrono::Duration::days(3),
            credits_find: 25,
            credits_verify: 25,
        }
    }
}
