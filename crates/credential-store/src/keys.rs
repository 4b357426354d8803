//! Storage key constants.

/// Storage keys used by the account client
pub struct StorageKeys;

impl StorageKeys {
    /// Serialized session record (tokens + identity + saved-at stamp)
    pub const SESSION: &'static str = "mailsfinder_session";

    /// Cached profile record (profile + cached-at stamp)
    pub const PROFILE_CACHE: &'static str = "mailsfinder_profile";

    /// Flag asking the next profile read to bypass the cache
    pub const FORCE_UPDATE: &'static str = "mailsfinder_force_update";
}
