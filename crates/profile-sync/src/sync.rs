//! Profile reconciliation on top of the datastore seam.

use crate::store::{CreditKind, ProfileStore, ProfileUpdate};
use crate::{ProfileError, ProfileResult};
use credential_store::{CredentialStore, UserProfile};
use tracing::{debug, info, warn};

/// Keeps the remote profile row and the local cache in step.
///
/// The cache is passed per call rather than owned: the session manager
/// owns the credential store, and profile operations borrow it.
pub struct ProfileSync<S: ProfileStore> {
    datastore: S,
}

impl<S: ProfileStore> ProfileSync<S> {
    pub fn new(datastore: S) -> Self {
        Self { datastore }
    }

    /// Make sure a profile row exists for the user, creating the free-plan
    /// default if it does not. Never overwrites an existing row, so
    /// calling this on every sign-in is safe.
    pub async fn ensure_profile(
        &self,
        access_token: &str,
        user_id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> ProfileResult<UserProfile> {
        if let Some(existing) = self.datastore.fetch(access_token, user_id).await? {
            debug!(user_id = %user_id, "Profile already exists");
            return Ok(existing);
        }

        let default_profile = UserProfile::new_free(user_id, email, full_name);
        self.datastore.upsert(access_token, &default_profile).await?;
        info!(user_id = %user_id, "Created default profile");

        // Re-fetch in case a concurrent ensure won the insert.
        Ok(self
            .datastore
            .fetch(access_token, user_id)
            .await?
            .unwrap_or(default_profile))
    }

    /// Fetch the profile, serving the cached copy when it is still within
    /// its TTL and belongs to the same user. A pending refresh request on
    /// the cache forces a datastore read.
    pub async fn fetch_with_cache(
        &self,
        cache: &CredentialStore,
        access_token: &str,
        user_id: &str,
    ) -> ProfileResult<Option<UserProfile>> {
        let refresh_requested = cache.take_refresh_request();
        if !refresh_requested {
            if let Some(cached) = cache.load_cached_profile() {
                if cached.id == user_id {
                    debug!(user_id = %user_id, "Serving profile from cache");
                    return Ok(Some(cached));
                }
            }
        }

        let profile = self.datastore.fetch(access_token, user_id).await?;
        if let Some(profile) = &profile {
            if let Err(e) = cache.cache_profile(profile) {
                warn!("Profile could not be cached: {}", e);
            }
        }
        Ok(profile)
    }

    /// Fetch the profile from the datastore, bypassing the cache. The
    /// cache is refreshed with the result.
    pub async fn fetch_fresh(
        &self,
        cache: &CredentialStore,
        access_token: &str,
        user_id: &str,
    ) -> ProfileResult<Option<UserProfile>> {
        let profile = self.datastore.fetch(access_token, user_id).await?;
        if let Some(profile) = &profile {
            if let Err(e) = cache.cache_profile(profile) {
                warn!("Profile could not be cached: {}", e);
            }
        }
        Ok(profile)
    }

    /// Apply a partial update and return the updated profile.
    pub async fn update(
        &self,
        cache: &CredentialStore,
        access_token: &str,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> ProfileResult<UserProfile> {
        self.datastore.update(access_token, user_id, update).await?;

        self.fetch_fresh(cache, access_token, user_id)
            .await?
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))
    }

    /// Spend one credit. Returns the remaining balance, or
    /// [`ProfileError::InsufficientCredits`] if none are left. The cached
    /// profile balance is adjusted to match.
    pub async fn deduct_credit(
        &self,
        cache: &CredentialStore,
        access_token: &str,
        user_id: &str,
        kind: CreditKind,
    ) -> ProfileResult<i64> {
        let remaining = self
            .datastore
            .decrement_credit(access_token, user_id, kind)
            .await?;

        if let Some(mut cached) = cache.load_cached_profile() {
            if cached.id == user_id {
                match kind {
                    CreditKind::Find => cached.credits_find = remaining,
                    CreditKind::Verify => cached.credits_verify = remaining,
                }
                if let Err(e) = cache.cache_profile(&cached) {
                    warn!("Cached credit balance could not be updated: {}", e);
                }
            }
        }

        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credential_store::MemoryStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryProfiles {
        rows: Mutex<HashMap<String, UserProfile>>,
        fetch_calls: AtomicUsize,
    }

    impl ProfileStore for Arc<MemoryProfiles> {
        async fn upsert(&self, _access_token: &str, profile: &UserProfile) -> ProfileResult<()> {
            let mut rows = self.rows.lock().unwrap();
            // Existing rows keep their data, like ignore-duplicates
            rows.entry(profile.id.clone()).or_insert_with(|| profile.clone());
            Ok(())
        }

        async fn fetch(
            &self,
            _access_token: &str,
            user_id: &str,
        ) -> ProfileResult<Option<UserProfile>> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().unwrap().get(user_id).cloned())
        }

        async fn update(
            &self,
            _access_token: &str,
            user_id: &str,
            update: &ProfileUpdate,
        ) -> ProfileResult<()> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(user_id)
                .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
            if let Some(name) = &update.full_name {
                row.full_name = Some(name.clone());
            }
            if let Some(company) = &update.company {
                row.company = Some(company.clone());
            }
            if let Some(plan) = &update.plan {
                row.plan = plan.clone();
            }
            if let Some(expiry) = update.plan_expiry {
                row.plan_expiry = expiry;
            }
            Ok(())
        }

        async fn decrement_credit(
            &self,
            _access_token: &str,
            user_id: &str,
            kind: CreditKind,
        ) -> ProfileResult<i64> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(user_id)
                .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;
            let balance = match kind {
                CreditKind::Find => &mut row.credits_find,
                CreditKind::Verify => &mut row.credits_verify,
            };
            if *balance <= 0 {
                return Err(ProfileError::InsufficientCredits {
                    kind: kind.as_str().to_string(),
                    remaining: *balance,
                });
            }
            *balance -= 1;
            Ok(*balance)
        }
    }

    fn setup() -> (Arc<MemoryProfiles>, ProfileSync<Arc<MemoryProfiles>>, CredentialStore) {
        let datastore = Arc::new(MemoryProfiles::default());
        let sync = ProfileSync::new(datastore.clone());
        let cache =
            CredentialStore::new(Box::new(MemoryStore::new()), Box::new(MemoryStore::new()));
        (datastore, sync, cache)
    }

    #[tokio::test]
    async fn ensure_creates_free_plan_defaults() {
        let (_, sync, _) = setup();

        let profile = sync
            .ensure_profile("at", "user-1", "a@b.com", Some("Ada"))
            .await
            .unwrap();
        assert_eq!(profile.plan, "free");
        assert_eq!(profile.credits_find, 25);
        assert_eq!(profile.credits_verify, 25);
    }

    #[tokio::test]
    async fn ensure_never_resets_an_existing_profile() {
        let (datastore, sync, _) = setup();

        sync.ensure_profile("at", "user-1", "a@b.com", None)
            .await
            .unwrap();

        // The user spends credits and upgrades.
        {
            let mut rows = datastore.rows.lock().unwrap();
            let row = rows.get_mut("user-1").unwrap();
            row.credits_find = 3;
            row.plan = "pro".to_string();
        }

        let profile = sync
            .ensure_profile("at", "user-1", "a@b.com", None)
            .await
            .unwrap();
        assert_eq!(profile.credits_find, 3);
        assert_eq!(profile.plan, "pro");
    }

    #[tokio::test]
    async fn fetch_with_cache_skips_datastore_on_hit() {
        let (datastore, sync, cache) = setup();
        sync.ensure_profile("at", "user-1", "a@b.com", None)
            .await
            .unwrap();

        sync.fetch_with_cache(&cache, "at", "user-1").await.unwrap();
        let calls_after_first = datastore.fetch_calls.load(Ordering::SeqCst);

        let cached = sync
            .fetch_with_cache(&cache, "at", "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.id, "user-1");
        assert_eq!(datastore.fetch_calls.load(Ordering::SeqCst), calls_after_first);
    }

    #[tokio::test]
    async fn refresh_request_bypasses_a_fresh_cache() {
        let (datastore, sync, cache) = setup();
        sync.ensure_profile("at", "user-1", "a@b.com", None)
            .await
            .unwrap();
        sync.fetch_with_cache(&cache, "at", "user-1").await.unwrap();

        // Another application changed the row out-of-band.
        datastore
            .rows
            .lock()
            .unwrap()
            .get_mut("user-1")
            .unwrap()
            .credits_find = 7;
        cache.request_refresh();

        let profile = sync
            .fetch_with_cache(&cache, "at", "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.credits_find, 7);

        // The request was consumed, the next read is served from cache.
        let calls = datastore.fetch_calls.load(Ordering::SeqCst);
        sync.fetch_with_cache(&cache, "at", "user-1").await.unwrap();
        assert_eq!(datastore.fetch_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn cache_for_another_user_is_not_served() {
        let (_, sync, cache) = setup();
        sync.ensure_profile("at", "user-1", "a@b.com", None)
            .await
            .unwrap();
        cache
            .cache_profile(&UserProfile::new_free("user-2", "x@y.com", None))
            .unwrap();

        let profile = sync
            .fetch_with_cache(&cache, "at", "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.id, "user-1");
    }

    #[tokio::test]
    async fn deduct_decrements_and_updates_cache() {
        let (_, sync, cache) = setup();
        sync.ensure_profile("at", "user-1", "a@b.com", None)
            .await
            .unwrap();
        sync.fetch_with_cache(&cache, "at", "user-1").await.unwrap();

        let remaining = sync
            .deduct_credit(&cache, "at", "user-1", CreditKind::Find)
            .await
            .unwrap();
        assert_eq!(remaining, 24);

        let cached = cache.load_cached_profile().unwrap();
        assert_eq!(cached.credits_find, 24);
        assert_eq!(cached.credits_verify, 25);
    }

    #[tokio::test]
    async fn deduct_at_zero_is_rejected() {
        let (datastore, sync, cache) = setup();
        sync.ensure_profile("at", "user-1", "a@b.com", None)
            .await
            .unwrap();
        datastore
            .rows
            .lock()
            .unwrap()
            .get_mut("user-1")
            .unwrap()
            .credits_verify = 1;

        // The last credit spends fine.
        let remaining = sync
            .deduct_credit(&cache, "at", "user-1", CreditKind::Verify)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        // The next spend is rejected.
        let err = sync
            .deduct_credit(&cache, "at", "user-1", CreditKind::Verify)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProfileError::InsufficientCredits { remaining: 0, .. }
        ));
    }

    #[tokio::test]
    async fn update_patches_and_refreshes_cache() {
        let (_, sync, cache) = setup();
        sync.ensure_profile("at", "user-1", "a@b.com", Some("Ada"))
            .await
            .unwrap();

        let updated = sync
            .update(
                &cache,
                "at",
                "user-1",
                &ProfileUpdate {
                    company: Some("Acme".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.company.as_deref(), Some("Acme"));
        assert_eq!(updated.full_name.as_deref(), Some("Ada"));

        let cached = cache.load_cached_profile().unwrap();
        assert_eq!(cached.company.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn update_of_missing_profile_errors() {
        let (_, sync, cache) = setup();

        let err = sync
            .update(
                &cache,
                "at",
                "ghost",
                &ProfileUpdate {
                    plan: Some("pro".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(_)));
    }
}
