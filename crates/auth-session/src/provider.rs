//! Identity provider seam.

use crate::AuthResult;

/// Tokens issued by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub user_id: String,
    pub email: Option<String>,
}

/// Result of a registration attempt.
///
/// When email confirmation is enabled the provider returns the new user
/// without tokens; the user signs in after clicking the confirmation link.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpGrant {
    pub user_id: String,
    pub email: Option<String>,
    /// Tokens, when the provider signed the user in immediately
    pub grant: Option<TokenGrant>,
    pub confirmation_required: bool,
}

/// Operations an identity provider must support.
///
/// The production implementation is [`SupabaseAuth`](crate::SupabaseAuth);
/// tests swap in an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider: Send + Sync {
    /// Exchange email and password for tokens.
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<TokenGrant>;

    /// Register a new account.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthResult<SignUpGrant>;

    /// Exchange a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant>;

    /// Revoke the session server-side.
    async fn sign_out(&self, access_token: &str) -> AuthResult<()>;

    /// Send a password reset email.
    async fn request_password_reset(&self, email: &str) -> AuthResult<()>;

    /// Resend the confirmation email for an unconfirmed account.
    async fn resend_confirmation(&self, email: &str) -> AuthResult<()>;
}
