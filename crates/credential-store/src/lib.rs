//! Session and profile persistence for the Mailsfinder account client.
//!
//! Sessions are written to two places: a primary key-value store and a
//! cookie-format mirror scoped to the parent domain, so a wiped primary
//! store can still be recovered from the mirror within the backup window.

mod cookie;
mod file;
mod keys;
mod memory;
mod session;
mod store;
mod traits;

pub use cookie::{format_set_cookie, parse_set_cookie, CookieFileStore, SESSION_COOKIE_MAX_AGE_SECS};
pub use file::FileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use session::{Session, SessionSource, UserProfile};
pub use store::{CredentialStore, PROFILE_CACHE_TTL_SECS, SESSION_BACKUP_WINDOW_SECS};
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for credential storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for credential storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
