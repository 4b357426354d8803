//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Invalid email or password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Email exists but has not been confirmed yet
    #[error("Email not confirmed")]
    EmailNotConfirmed,

    /// Registration rejected by the identity provider
    #[error("Sign-up failed: {0}")]
    SignUpRejected(String),

    /// Token refresh error
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// Refresh retries exhausted
    #[error("Token refresh failed after {0} attempts")]
    RefreshExhausted(u32),

    /// Session not found
    #[error("Not signed in")]
    NotSignedIn,

    /// Session was invalidated server-side (revoked, signed out elsewhere, etc.)
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] credential_store::StoreError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Network unavailable (transient error, can retry)
    #[error("Network unavailable")]
    NetworkUnavailable,
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Network unavailable
    /// - HTTP errors with 5xx status codes
    /// - Connection timeouts
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::NetworkUnavailable => true,
            AuthError::Timeout => true,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_unavailable_is_transient() {
        assert!(AuthError::NetworkUnavailable.is_transient());
    }

    #[test]
    fn timeout_is_transient() {
        assert!(AuthError::Timeout.is_transient());
    }

    #[test]
    fn credential_errors_are_not_transient() {
        assert!(!AuthError::InvalidCredentials("bad password".to_string()).is_transient());
        assert!(!AuthError::EmailNotConfirmed.is_transient());
        assert!(!AuthError::NotSignedIn.is_transient());
        assert!(!AuthError::RefreshExhausted(3).is_transient());
        assert!(!AuthError::SessionInvalid("revoked".to_string()).is_transient());
    }
}
