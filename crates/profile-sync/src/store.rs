//! Profile datastore seam.

use crate::ProfileResult;
use chrono::{DateTime, Utc};
use credential_store::UserProfile;
use serde::Serialize;

/// Which credit balance an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    Find,
    Verify,
}

impl CreditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditKind::Find => "find",
            CreditKind::Verify => "verify",
        }
    }
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_expiry: Option<DateTime<Utc>>,
    /// Billing reference written by plan upgrades, never read back here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.company.is_none()
            && self.plan.is_none()
            && self.plan_expiry.is_none()
            && self.subscription_id.is_none()
            && self.customer_id.is_none()
    }
}

/// Operations a profile datastore must support.
///
/// The production implementation is
/// [`SupabaseProfiles`](crate::SupabaseProfiles); tests swap in an
/// in-memory fake.
#[allow(async_fn_in_trait)]
pub trait ProfileStore: Send + Sync {
    /// Insert the profile, or leave the existing row alone if one exists.
    async fn upsert(&self, access_token: &str, profile: &UserProfile) -> ProfileResult<()>;

    /// Fetch the profile row for a user.
    async fn fetch(&self, access_token: &str, user_id: &str) -> ProfileResult<Option<UserProfile>>;

    /// Apply a partial update to the profile row.
    async fn update(
        &self,
        access_token: &str,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> ProfileResult<()>;

    /// Atomically decrement a credit balance by one, failing if the
    /// balance is already zero. Returns the remaining balance.
    async fn decrement_credit(
        &self,
        access_token: &str,
        user_id: &str,
        kind: CreditKind,
    ) -> ProfileResult<i64>;
}
