//! Profile datastore error types.

use thiserror::Error;

/// Error type for profile operations.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The user has no credits left of the requested kind
    #[error("Insufficient {kind} credits: {remaining} remaining")]
    InsufficientCredits { kind: String, remaining: i64 },

    /// No profile row exists for the user
    #[error("Profile not found for user {0}")]
    NotFound(String),

    /// Datastore rejected the request
    #[error("Datastore error: {0}")]
    Datastore(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ProfileError.
pub type ProfileResult<T> = Result<T, ProfileError>;
