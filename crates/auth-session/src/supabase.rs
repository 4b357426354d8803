//! Supabase Auth (GoTrue) identity provider.

use crate::provider::{IdentityProvider, SignUpGrant, TokenGrant};
use crate::{AuthError, AuthResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Supabase token grant response (password, refresh, and immediate-signup
/// grants all share this shape).
#[derive(Debug, Deserialize)]
struct GrantResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Signup response. With email confirmation enabled the body is a bare
/// user object; otherwise it is a full token grant.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Grant(GrantResponse),
    PendingUser(UserPayload),
}

/// Identity provider backed by the Supabase Auth REST API.
pub struct SupabaseAuth {
    base_url: String,
    publishable_key: String,
    http_client: Client,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, publishable_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            publishable_key: publishable_key.to_string(),
            http_client: Client::new(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn grant_from(data: GrantResponse) -> TokenGrant {
        TokenGrant {
            access_token: data.access_token,
            refresh_token: data.refresh_token,
            expires_in: data.expires_in,
            user_id: data.user.id,
            email: data.user.email,
        }
    }

    async fn read_failure(response: reqwest::Response) -> (reqwest::StatusCode, String) {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        (status, body)
    }
}

fn is_unconfirmed_email(body: &str) -> bool {
    body.contains("email_not_confirmed") || body.contains("Email not confirmed")
}

impl IdentityProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<TokenGrant> {
        let url = self.auth_url("token?grant_type=password");
        debug!(url = %url, email = %email, "Attempting email/password sign-in");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::read_failure(response).await;
            warn!(status = %status, body = %body, "Sign-in failed");

            if is_unconfirmed_email(&body) {
                return Err(AuthError::EmailNotConfirmed);
            }
            return Err(AuthError::InvalidCredentials(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let data: GrantResponse = response.json().await?;
        Ok(Self::grant_from(data))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthResult<SignUpGrant> {
        let url = self.auth_url("signup");
        debug!(url = %url, email = %email, "Registering new account");

        let mut body = serde_json::json!({
            "email": email,
            "password": password,
        });
        if let Some(name) = full_name {
            body["data"] = serde_json::json!({ "full_name": name });
        }

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::read_failure(response).await;
            warn!(status = %status, body = %body, "Sign-up failed");
            return Err(AuthError::SignUpRejected(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        match response.json().await? {
            SignUpResponse::Grant(data) => {
                let user_id = data.user.id.clone();
                let user_email = data.user.email.clone();
                Ok(SignUpGrant {
                    user_id,
                    email: user_email,
                    grant: Some(Self::grant_from(data)),
                    confirmation_required: false,
                })
            }
            SignUpResponse::PendingUser(user) => Ok(SignUpGrant {
                user_id: user.id,
                email: user.email,
                grant: None,
                confirmation_required: true,
            }),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant> {
        let url = self.auth_url("token?grant_type=refresh_token");
        debug!(url = %url, "Refreshing token");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::read_failure(response).await;
            warn!(status = %status, body = %body, "Token refresh failed");
            return Err(AuthError::TokenRefresh(format!("HTTP {}: {}", status, body)));
        }

        let data: GrantResponse = response.json().await?;
        Ok(Self::grant_from(data))
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let url = self.auth_url("logout");
        debug!(url = %url, "Revoking session");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::read_failure(response).await;
            warn!(status = %status, body = %body, "Server-side sign-out failed");
            return Err(AuthError::SessionInvalid(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let url = self.auth_url("recover");
        debug!(url = %url, email = %email, "Requesting password reset");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::read_failure(response).await;
            warn!(status = %status, body = %body, "Password reset request failed");
            return Err(AuthError::InvalidCredentials(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn resend_confirmation(&self, email: &str) -> AuthResult<()> {
        let url = self.auth_url("resend");
        debug!(url = %url, email = %email, "Resending confirmation email");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "type": "signup",
                "email": email,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = Self::read_failure(response).await;
            warn!(status = %status, body = %body, "Resend confirmation failed");
            return Err(AuthError::SignUpRejected(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_url_joins_without_double_slash() {
        let auth = SupabaseAuth::new("https://proj.supabase.co/", "key");
        assert_eq!(
            auth.auth_url("token?grant_type=password"),
            "https://proj.supabase.co/auth/v1/token?grant_type=password"
        );
        assert_eq!(auth.auth_url("logout"), "https://proj.supabase.co/auth/v1/logout");
    }

    #[test]
    fn unconfirmed_email_detected_in_error_body() {
        assert!(is_unconfirmed_email(
            r#"{"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#
        ));
        assert!(!is_unconfirmed_email(
            r#"{"error_code":"invalid_grant","msg":"Invalid login credentials"}"#
        ));
    }

    #[test]
    fn signup_response_parses_both_shapes() {
        let grant = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "user": {"id": "user-1", "email": "a@b.com"}
        }"#;
        assert!(matches!(
            serde_json::from_str::<SignUpResponse>(grant).unwrap(),
            SignUpResponse::Grant(_)
        ));

        let pending = r#"{"id": "user-1", "email": "a@b.com", "confirmation_sent_at": "2026-01-01T00:00:00Z"}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpResponse>(pending).unwrap(),
            SignUpResponse::PendingUser(_)
        ));
    }
}
