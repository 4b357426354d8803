//! Dual-location credential store.

use crate::{KeyValueStore, Session, SessionSource, StorageKeys, StoreError, StoreResult, UserProfile};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// How long a saved session stays restorable: 7 days.
pub const SESSION_BACKUP_WINDOW_SECS: i64 = 604_800;

/// How long a cached profile is served without a refetch: 5 minutes.
pub const PROFILE_CACHE_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    session: Session,
    /// When this revision was written (Unix seconds)
    saved_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileRecord {
    profile: UserProfile,
    cached_at: i64,
}

/// Persists sessions to a primary store and a cookie-format mirror, and
/// keeps a short-lived profile cache in the primary store.
///
/// Reads never fail: a backend error on either side is logged and treated
/// as that side being empty, so a broken mirror degrades to primary-only
/// operation instead of blocking sign-in.
pub struct CredentialStore {
    primary: Box<dyn KeyValueStore>,
    mirror: Box<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(primary: Box<dyn KeyValueStore>, mirror: Box<dyn KeyValueStore>) -> Self {
        Self { primary, mirror }
    }

    /// Save a session to both locations.
    ///
    /// Both revisions carry the same saved-at stamp, which is what
    /// [`load_session`](Self::load_session) uses to pick the newer side
    /// when they diverge. Fails only if neither location accepted the
    /// write.
    pub fn save_session(&self, session: &Session) -> StoreResult<()> {
        let record = SessionRecord {
            session: session.clone(),
            saved_at: Utc::now().timestamp(),
        };
        let json =
            serde_json::to_string(&record).map_err(|e| StoreError::Encoding(e.to_string()))?;

        let primary_ok = match self.primary.set(StorageKeys::SESSION, &json) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Primary session write failed: {}", e);
                false
            }
        };
        let mirror_ok = match self.mirror.set(StorageKeys::SESSION, &json) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Mirror session write failed: {}", e);
                false
            }
        };

        if primary_ok || mirror_ok {
            Ok(())
        } else {
            Err(StoreError::Backend(
                "Session could not be saved to any location".to_string(),
            ))
        }
    }

    /// Load the most recent saved session with a live access token.
    ///
    /// Returns `None` when nothing is stored or when the stored token is
    /// expired; use [`load_stale_session`](Self::load_stale_session) to
    /// recover an expired session for refresh.
    pub fn load_session(&self) -> Option<Session> {
        self.load_stale_session()
            .filter(|session| !session.is_expired())
    }

    /// Load the most recent saved session, if one exists within the
    /// 7-day backup window, regardless of token expiry.
    ///
    /// Both locations are read and the revision with the newer saved-at
    /// stamp wins; the losing side is rewritten to match so the two
    /// locations converge. The returned session may have an expired
    /// access token, the caller decides whether to refresh.
    pub fn load_stale_session(&self) -> Option<Session> {
        let primary = self.read_record(self.primary.as_ref(), "primary");
        let mirror = self.read_record(self.mirror.as_ref(), "mirror");

        let (record, heal_mirror) = match (primary, mirror) {
            (Some(p), Some(m)) => {
                if p.saved_at >= m.saved_at {
                    (p, true)
                } else {
                    (m, false)
                }
            }
            (Some(p), None) => (p, true),
            (None, Some(m)) => (m, false),
            (None, None) => return None,
        };

        self.heal(&record, heal_mirror);

        let mut session = record.session;
        session.source = SessionSource::Restored;
        Some(session)
    }

    fn read_record(&self, store: &dyn KeyValueStore, side: &str) -> Option<SessionRecord> {
        let json = match store.get(StorageKeys::SESSION) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Reading {} session failed: {}", side, e);
                return None;
            }
        };

        let record: SessionRecord = match serde_json::from_str(&json) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Discarding unreadable {} session record: {}", side, e);
                return None;
            }
        };

        if Utc::now().timestamp() - record.saved_at > SESSION_BACKUP_WINDOW_SECS {
            tracing::debug!("Discarding {} session past the backup window", side);
            return None;
        }

        Some(record)
    }

    fn heal(&self, record: &SessionRecord, heal_mirror: bool) {
        let Ok(json) = serde_json::to_string(record) else {
            return;
        };
        let (store, side) = if heal_mirror {
            (self.mirror.as_ref(), "mirror")
        } else {
            (self.primary.as_ref(), "primary")
        };
        if let Err(e) = store.set(StorageKeys::SESSION, &json) {
            tracing::warn!("Could not sync session to {}: {}", side, e);
        }
    }

    /// Remove the session and cached profile from both locations.
    /// Safe to call when nothing is stored.
    pub fn clear_session(&self) -> StoreResult<()> {
        let _ = self.primary.delete(StorageKeys::SESSION);
        let _ = self.mirror.delete(StorageKeys::SESSION);
        let _ = self.primary.delete(StorageKeys::PROFILE_CACHE);
        Ok(())
    }

    /// Cache a profile in the primary store.
    pub fn cache_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        let record = ProfileRecord {
            profile: profile.clone(),
            cached_at: Utc::now().timestamp(),
        };
        let json =
            serde_json::to_string(&record).map_err(|e| StoreError::Encoding(e.to_string()))?;
        self.primary.set(StorageKeys::PROFILE_CACHE, &json)
    }

    /// Load the cached profile if it is younger than the 5-minute TTL.
    pub fn load_cached_profile(&self) -> Option<UserProfile> {
        let json = match self.primary.get(StorageKeys::PROFILE_CACHE) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Reading cached profile failed: {}", e);
                return None;
            }
        };

        let record: ProfileRecord = match serde_json::from_str(&json) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Discarding unreadable profile cache: {}", e);
                return None;
            }
        };

        if Utc::now().timestamp() - record.cached_at > PROFILE_CACHE_TTL_SECS {
            return None;
        }

        Some(record.profile)
    }

    /// Ask the next profile read to bypass the cache. Another application
    /// sharing the store may have changed the row out-of-band.
    pub fn request_refresh(&self) {
        if let Err(e) = self.primary.set(StorageKeys::FORCE_UPDATE, "1") {
            tracing::warn!("Refresh flag could not be set: {}", e);
        }
    }

    /// Consume a pending refresh request. Returns true at most once per
    /// [`request_refresh`](Self::request_refresh) call.
    pub fn take_refresh_request(&self) -> bool {
        match self.primary.delete(StorageKeys::FORCE_UPDATE) {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!("Refresh flag could not be read: {}", e);
                false
            }
        }
    }
}
