//! Supabase (PostgREST) profile datastore.
//!
//! Profiles live in the `profiles` table, keyed by the auth user ID.
//! Credit decrements go through the `deduct_credit` database function so
//! the check-and-decrement happens in one statement server-side; two
//! concurrent spends can never both succeed on a balance of one.

use crate::store::{CreditKind, ProfileStore, ProfileUpdate};
use crate::{ProfileError, ProfileResult};
use credential_store::UserProfile;
use serde::Deserialize;
use tracing::{debug, error, info};

/// Response shape of the `deduct_credit` database function.
#[derive(Debug, Deserialize)]
struct DeductResponse {
    allowed: bool,
    remaining: i64,
}

/// Profile datastore backed by the Supabase REST API.
#[derive(Clone)]
pub struct SupabaseProfiles {
    http_client: reqwest::Client,
    api_url: String,
    publishable_key: String,
}

impl SupabaseProfiles {
    pub fn new(api_url: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            publishable_key: publishable_key.into(),
        }
    }

    /// Build the REST API URL for a table.
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.api_url, function)
    }

    async fn fail(
        response: reqwest::Response,
        context: &str,
    ) -> ProfileError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %body, "{}", context);
        ProfileError::Datastore(format!("{}: HTTP {}: {}", context, status, body))
    }
}

impl ProfileStore for SupabaseProfiles {
    async fn upsert(&self, access_token: &str, profile: &UserProfile) -> ProfileResult<()> {
        let url = format!("{}?on_conflict=id", self.rest_url("profiles"));

        debug!(user_id = %profile.id, "Upserting profile");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json")
            // Existing rows keep their credits and plan
            .header("Prefer", "resolution=ignore-duplicates")
            .json(profile)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "Failed to upsert profile").await);
        }

        info!(user_id = %profile.id, "Profile upserted");
        Ok(())
    }

    async fn fetch(&self, access_token: &str, user_id: &str) -> ProfileResult<Option<UserProfile>> {
        let url = format!(
            "{}?id=eq.{}&select=*&limit=1",
            self.rest_url("profiles"),
            user_id
        );

        debug!(user_id = %user_id, "Fetching profile");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "Failed to fetch profile").await);
        }

        let rows: Vec<UserProfile> = response.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn update(
        &self,
        access_token: &str,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> ProfileResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        let url = format!("{}?id=eq.{}", self.rest_url("profiles"), user_id);

        debug!(user_id = %user_id, "Updating profile");

        let response = self
            .http_client
            .patch(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "Failed to update profile").await);
        }

        Ok(())
    }

    async fn decrement_credit(
        &self,
        access_token: &str,
        user_id: &str,
        kind: CreditKind,
    ) -> ProfileResult<i64> {
        let url = self.rpc_url("deduct_credit");

        debug!(user_id = %user_id, kind = kind.as_str(), "Deducting credit");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "p_user_id": user_id,
                "p_kind": kind.as_str(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::fail(response, "Failed to deduct credit").await);
        }

        let result: DeductResponse = response.json().await?;
        if !result.allowed {
            return Err(ProfileError::InsufficientCredits {
                kind: kind.as_str().to_string(),
                remaining: result.remaining,
            });
        }

        info!(
            user_id = %user_id,
            kind = kind.as_str(),
            remaining = result.remaining,
            "Credit deducted"
        );
        Ok(result.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_url_joins_table() {
        let store = SupabaseProfiles::new("https://test.supabase.co/", "key");
        assert_eq!(
            store.rest_url("profiles"),
            "https://test.supabase.co/rest/v1/profiles"
        );
        assert_eq!(
            store.rpc_url("deduct_credit"),
            "https://test.supabase.co/rest/v1/rpc/deduct_credit"
        );
    }

    #[test]
    fn deduct_response_parses() {
        let granted: DeductResponse =
            serde_json::from_str(r#"{"allowed": true, "remaining": 24}"#).unwrap();
        assert!(granted.allowed);
        assert_eq!(granted.remaining, 24);

        let denied: DeductResponse =
            serde_json::from_str(r#"{"allowed": false, "remaining": 0}"#).unwrap();
        assert!(!denied.allowed);
    }
}
