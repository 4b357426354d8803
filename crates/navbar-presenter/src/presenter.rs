//! Navbar presenter.

use crate::gate::MountGate;
use crate::model::{NavbarModel, NavbarSurface};
use credential_store::{CredentialStore, Session};
use profile_sync::{ProfileStore, ProfileSync};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How long to wait for the navbar surface to mount before abandoning a
/// render.
pub const NAVBAR_MOUNT_DEADLINE: Duration = Duration::from_secs(1);

/// How long a profile fetch may take before the cached profile is used
/// instead.
pub const PROFILE_FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Renders session state onto a navbar surface.
///
/// Every render waits on the mount gate first; if the surface never
/// mounts within the deadline the render is dropped silently, matching
/// pages that have no navbar at all.
pub struct NavbarPresenter<V: NavbarSurface> {
    surface: V,
    gate: MountGate,
    mount_deadline: Duration,
    fetch_timeout: Duration,
}

impl<V: NavbarSurface> NavbarPresenter<V> {
    pub fn new(surface: V, gate: MountGate) -> Self {
        Self {
            surface,
            gate,
            mount_deadline: NAVBAR_MOUNT_DEADLINE,
            fetch_timeout: PROFILE_FETCH_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeouts(
        surface: V,
        gate: MountGate,
        mount_deadline: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            surface,
            gate,
            mount_deadline,
            fetch_timeout,
        }
    }

    async fn mounted(&self) -> bool {
        if self.gate.wait_ready(self.mount_deadline).await {
            true
        } else {
            debug!("Navbar surface never mounted, skipping render");
            false
        }
    }

    /// Render the signed-out navbar.
    pub async fn render_signed_out(&self) {
        if !self.mounted().await {
            return;
        }
        self.surface.apply(&NavbarModel::SignedOut);
    }

    /// Render the signed-in navbar from whatever profile data is at hand.
    pub async fn render_signed_in(
        &self,
        session: &Session,
        profile: Option<&credential_store::UserProfile>,
    ) {
        if !self.mounted().await {
            return;
        }
        self.surface.apply(&NavbarModel::signed_in(session, profile));
    }

    /// Re-render with a fresh profile from the datastore.
    ///
    /// A fetch that fails or exceeds the timeout falls back to the cached
    /// profile; the navbar shows slightly stale figures instead of
    /// blocking on a slow datastore.
    pub async fn resync<S: ProfileStore>(
        &self,
        sync: &ProfileSync<S>,
        cache: &CredentialStore,
        session: &Session,
    ) {
        if !self.mounted().await {
            return;
        }

        let profile = match timeout(
            self.fetch_timeout,
            sync.fetch_fresh(cache, &session.access_token, &session.user_id),
        )
        .await
        {
            Ok(Ok(profile)) => profile,
            Ok(Err(e)) => {
                warn!("Profile fetch failed, using cached profile: {}", e);
                cache.load_cached_profile()
            }
            Err(_) => {
                warn!("Profile fetch timed out, using cached profile");
                cache.load_cached_profile()
            }
        };

        self.surface
            .apply(&NavbarModel::signed_in(session, profile.as_ref()));
    }
}
