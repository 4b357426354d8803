//! Page controllers for the auth pages.
//!
//! Each form submit validates locally first and only then talks to the
//! session manager, so malformed input never costs a network round trip.
//! Controllers return outcome values; the shell decides how to show the
//! message and when to follow the redirect.

use crate::routes::Route;
use auth_session::{IdentityProvider, SessionManager};
use credential_store::Session;
use navbar_presenter::{NavbarPresenter, NavbarSurface};
use profile_sync::{ProfileStore, ProfileSync};
use site_core::validate;
use std::time::Duration;
use tracing::warn;

/// Pause before following the post-login redirect, long enough to read
/// the success message.
pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// Pause before the post-signup redirect; the message mentions the
/// confirmation email, so it gets longer.
pub const SIGNUP_REDIRECT_DELAY: Duration = Duration::from_millis(3000);

/// Where to go next, and after how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub route: Route,
    pub delay: Duration,
}

/// Result of a form submit.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub success: bool,
    pub message: String,
    /// Whether offering "resend confirmation email" makes sense
    pub resend_available: bool,
    pub redirect: Option<Redirect>,
}

impl PageOutcome {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            resend_available: false,
            redirect: None,
        }
    }
}

/// Drives the auth pages against the session manager.
pub struct PageController<P: IdentityProvider> {
    sessions: SessionManager<P>,
}

impl<P: IdentityProvider> PageController<P> {
    pub fn new(sessions: SessionManager<P>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &SessionManager<P> {
        &self.sessions
    }

    /// Login form submit.
    pub async fn handle_login(&self, email: &str, password: &str) -> PageOutcome {
        if email.is_empty() || password.is_empty() {
            return PageOutcome::failure("Please fill in all fields.");
        }
        if !validate::is_valid_email(email) {
            return PageOutcome::failure("Please enter a valid email address.");
        }

        let outcome = self.sessions.sign_in(email, password).await;
        PageOutcome {
            success: outcome.success,
            message: outcome.message,
            resend_available: outcome.resend_available,
            redirect: outcome.success.then_some(Redirect {
                route: Route::Home,
                delay: LOGIN_REDIRECT_DELAY,
            }),
        }
    }

    /// Signup form submit.
    ///
    /// When the provider issues tokens immediately, the profile row is
    /// created right here. An account pending email confirmation has no
    /// bearer token yet; its row is created on first sign-in by
    /// [`reconcile`](Self::reconcile).
    pub async fn handle_signup<S: ProfileStore>(
        &self,
        profiles: &ProfileSync<S>,
        full_name: Option<&str>,
        email: &str,
        password: &str,
        confirm_password: &str,
        agreed_terms: bool,
    ) -> PageOutcome {
        if email.is_empty() || password.is_empty() {
            return PageOutcome::failure("Please fill in all fields.");
        }
        if !validate::is_valid_email(email) {
            return PageOutcome::failure("Please enter a valid email address.");
        }
        if !validate::is_strong_password(password) {
            return PageOutcome::failure(
                "Password must be at least 8 characters and include uppercase, \
                 lowercase, a number, and a symbol.",
            );
        }
        if password != confirm_password {
            return PageOutcome::failure("Passwords do not match.");
        }
        if !agreed_terms {
            return PageOutcome::failure("Please accept the terms and conditions.");
        }

        let outcome = self.sessions.sign_up(email, password, full_name).await;
        if let Some(session) = outcome.session.as_ref() {
            match profiles
                .ensure_profile(&session.access_token, &session.user_id, &session.email, full_name)
                .await
            {
                Ok(profile) => {
                    if let Err(e) = self.sessions.store().cache_profile(&profile) {
                        warn!("Profile could not be cached: {}", e);
                    }
                }
                // The account exists and the session works; reconcile will
                // retry the row on the next page load.
                Err(e) => warn!("Profile creation at signup failed: {}", e),
            }
        }

        let redirect = if !outcome.success {
            None
        } else if outcome.confirmation_required {
            Some(Redirect {
                route: Route::Login,
                delay: SIGNUP_REDIRECT_DELAY,
            })
        } else {
            Some(Redirect {
                route: Route::Home,
                delay: LOGIN_REDIRECT_DELAY,
            })
        };

        PageOutcome {
            success: outcome.success,
            message: outcome.message,
            resend_available: false,
            redirect,
        }
    }

    /// Password-reset form submit. Whatever fails inside, the user gets a
    /// message rather than an error.
    pub async fn handle_reset(&self, email: &str) -> PageOutcome {
        if email.is_empty() || !validate::is_valid_email(email) {
            return PageOutcome::failure("Please enter a valid email address.");
        }

        let outcome = self.sessions.reset_password(email).await;
        PageOutcome {
            success: outcome.success,
            message: outcome.message,
            resend_available: false,
            redirect: None,
        }
    }

    /// Resend the confirmation email.
    pub async fn handle_resend(&self, email: &str) -> PageOutcome {
        if email.is_empty() || !validate::is_valid_email(email) {
            return PageOutcome::failure("Please enter a valid email address.");
        }

        let outcome = self.sessions.resend_confirmation(email).await;
        PageOutcome {
            success: outcome.success,
            message: outcome.message,
            resend_available: false,
            redirect: None,
        }
    }

    /// Sign out and flip the navbar in place.
    pub async fn sign_out<V: NavbarSurface>(&self, navbar: &NavbarPresenter<V>) {
        self.sessions.sign_out().await;
        navbar.render_signed_out().await;
    }

    /// Page-load reconciliation: restore the session (refreshing if
    /// needed), make sure the profile row exists, and render the navbar
    /// to match.
    pub async fn reconcile<S: ProfileStore, V: NavbarSurface>(
        &self,
        profiles: &ProfileSync<S>,
        navbar: &NavbarPresenter<V>,
    ) -> Option<Session> {
        let Some(session) = self.sessions.current_session().await else {
            navbar.render_signed_out().await;
            return None;
        };

        match profiles
            .ensure_profile(&session.access_token, &session.user_id, &session.email, None)
            .await
        {
            Ok(profile) => {
                if let Err(e) = self.sessions.store().cache_profile(&profile) {
                    warn!("Profile could not be cached: {}", e);
                }
                navbar.render_signed_in(&session, Some(&profile)).await;
            }
            Err(e) => {
                warn!("Profile reconciliation failed: {}", e);
                navbar
                    .resync(profiles, self.sessions.store(), &session)
                    .await;
            }
        }

        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_session::{AuthError, AuthResult, SignUpGrant, TokenGrant};
    use chrono::Utc;
    use credential_store::{CredentialStore, MemoryStore, SessionSource, UserProfile};
    use navbar_presenter::{MountGate, NavbarModel};
    use profile_sync::{CreditKind, ProfileError, ProfileResult, ProfileUpdate};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeProvider {
        sign_in_results: Arc<Mutex<VecDeque<AuthResult<TokenGrant>>>>,
        sign_up_results: Arc<Mutex<VecDeque<AuthResult<SignUpGrant>>>>,
    }

    impl IdentityProvider for FakeProvider {
        async fn sign_in(&self, _email: &str, _password: &str) -> AuthResult<TokenGrant> {
            self.sign_in_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected sign_in call")
        }

        async fn sign_up(
            &self,
            _email: &str,
            _password: &str,
            _full_name: Option<&str>,
        ) -> AuthResult<SignUpGrant> {
            self.sign_up_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected sign_up call")
        }

        async fn refresh(&self, _refresh_token: &str) -> AuthResult<TokenGrant> {
            Err(AuthError::NetworkUnavailable)
        }

        async fn sign_out(&self, _access_token: &str) -> AuthResult<()> {
            Ok(())
        }

        async fn request_password_reset(&self, _email: &str) -> AuthResult<()> {
            Ok(())
        }

        async fn resend_confirmation(&self, _email: &str) -> AuthResult<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSurface {
        applied: Arc<Mutex<Vec<NavbarModel>>>,
    }

    impl NavbarSurface for RecordingSurface {
        fn apply(&self, model: &NavbarModel) {
            self.applied.lock().unwrap().push(model.clone());
        }
    }

    #[derive(Default)]
    struct EmptyProfiles;

    impl ProfileStore for EmptyProfiles {
        async fn upsert(&self, _t: &str, _p: &UserProfile) -> ProfileResult<()> {
            Ok(())
        }
        async fn fetch(&self, _t: &str, _u: &str) -> ProfileResult<Option<UserProfile>> {
            Ok(None)
        }
        async fn update(&self, _t: &str, _u: &str, _up: &ProfileUpdate) -> ProfileResult<()> {
            Ok(())
        }
        async fn decrement_credit(
            &self,
            _t: &str,
            _u: &str,
            _k: CreditKind,
        ) -> ProfileResult<i64> {
            Err(ProfileError::NotFound("none".to_string()))
        }
    }

    /// Datastore fake that records every inserted row.
    #[derive(Clone, Default)]
    struct RecordingProfiles {
        upserted: Arc<Mutex<Vec<UserProfile>>>,
    }

    impl ProfileStore for RecordingProfiles {
        async fn upsert(&self, _t: &str, profile: &UserProfile) -> ProfileResult<()> {
            self.upserted.lock().unwrap().push(profile.clone());
            Ok(())
        }
        async fn fetch(&self, _t: &str, _u: &str) -> ProfileResult<Option<UserProfile>> {
            Ok(None)
        }
        async fn update(&self, _t: &str, _u: &str, _up: &ProfileUpdate) -> ProfileResult<()> {
            Ok(())
        }
        async fn decrement_credit(
            &self,
            _t: &str,
            _u: &str,
            _k: CreditKind,
        ) -> ProfileResult<i64> {
            Ok(0)
        }
    }

    fn controller() -> (FakeProvider, PageController<FakeProvider>) {
        let provider = FakeProvider::default();
        let store =
            CredentialStore::new(Box::new(MemoryStore::new()), Box::new(MemoryStore::new()));
        let sessions = SessionManager::new(provider.clone(), store);
        (provider, PageController::new(sessions))
    }

    fn grant() -> TokenGrant {
        TokenGrant {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_in: 3600,
            user_id: "user-1".to_string(),
            email: Some("ada@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn login_rejects_bad_input_without_network() {
        let (_, controller) = controller();

        let empty = controller.handle_login("", "pw").await;
        assert!(!empty.success);
        assert_eq!(empty.message, "Please fill in all fields.");

        let bad_email = controller.handle_login("not-an-email", "pw").await;
        assert!(!bad_email.success);
        assert_eq!(bad_email.message, "Please enter a valid email address.");
    }

    #[tokio::test]
    async fn login_success_redirects_home_after_delay() {
        let (provider, controller) = controller();
        provider.sign_in_results.lock().unwrap().push_back(Ok(grant()));

        let outcome = controller.handle_login("ada@example.com", "pw").await;
        assert!(outcome.success);
        let redirect = outcome.redirect.unwrap();
        assert_eq!(redirect.route, Route::Home);
        assert_eq!(redirect.delay, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn unconfirmed_login_offers_resend() {
        let (provider, controller) = controller();
        provider
            .sign_in_results
            .lock()
            .unwrap()
            .push_back(Err(AuthError::EmailNotConfirmed));

        let outcome = controller.handle_login("ada@example.com", "pw").await;
        assert!(!outcome.success);
        assert!(outcome.resend_available);
        assert!(outcome.redirect.is_none());
    }

    #[tokio::test]
    async fn signup_rejects_weak_password_and_mismatch() {
        let (_, controller) = controller();
        let profiles = ProfileSync::new(EmptyProfiles);

        let weak = controller
            .handle_signup(&profiles, None, "ada@example.com", "abcdefgh", "abcdefgh", true)
            .await;
        assert!(!weak.success);
        assert!(weak.message.contains("at least 8 characters"));

        let mismatch = controller
            .handle_signup(&profiles, None, "ada@example.com", "Abcdef1!", "Abcdef1?", true)
            .await;
        assert!(!mismatch.success);
        assert_eq!(mismatch.message, "Passwords do not match.");
    }

    #[tokio::test]
    async fn signup_requires_accepted_terms() {
        // The provider has no queued responses; reaching it would panic.
        let (_, controller) = controller();
        let profiles = ProfileSync::new(EmptyProfiles);

        let outcome = controller
            .handle_signup(&profiles, None, "ada@example.com", "Abcdef1!", "Abcdef1!", false)
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Please accept the terms and conditions.");
        assert!(outcome.redirect.is_none());
    }

    #[tokio::test]
    async fn signup_with_confirmation_redirects_to_login() {
        let (provider, controller) = controller();
        provider
            .sign_up_results
            .lock()
            .unwrap()
            .push_back(Ok(SignUpGrant {
                user_id: "user-1".to_string(),
                email: Some("ada@example.com".to_string()),
                grant: None,
                confirmation_required: true,
            }));

        let profiles = ProfileSync::new(RecordingProfiles::default());
        let outcome = controller
            .handle_signup(&profiles, Some("Ada"), "ada@example.com", "Abcdef1!", "Abcdef1!", true)
            .await;
        assert!(outcome.success);
        let redirect = outcome.redirect.unwrap();
        assert_eq!(redirect.route, Route::Login);
        assert_eq!(redirect.delay, Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn signup_with_immediate_grant_creates_profile_row() {
        let (provider, controller) = controller();
        provider
            .sign_up_results
            .lock()
            .unwrap()
            .push_back(Ok(SignUpGrant {
                user_id: "user-1".to_string(),
                email: Some("ada@example.com".to_string()),
                grant: Some(grant()),
                confirmation_required: false,
            }));

        let datastore = RecordingProfiles::default();
        let profiles = ProfileSync::new(datastore.clone());
        let outcome = controller
            .handle_signup(&profiles, Some("Ada"), "ada@example.com", "Abcdef1!", "Abcdef1!", true)
            .await;
        assert!(outcome.success);

        let upserted = datastore.upserted.lock().unwrap();
        assert_eq!(upserted.len(), 1);
        assert_eq!(upserted[0].id, "user-1");
        assert_eq!(upserted[0].full_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn signup_pending_confirmation_defers_profile_row() {
        let (provider, controller) = controller();
        provider
            .sign_up_results
            .lock()
            .unwrap()
            .push_back(Ok(SignUpGrant {
                user_id: "user-1".to_string(),
                email: Some("ada@example.com".to_string()),
                grant: None,
                confirmation_required: true,
            }));

        let datastore = RecordingProfiles::default();
        let profiles = ProfileSync::new(datastore.clone());
        let outcome = controller
            .handle_signup(&profiles, Some("Ada"), "ada@example.com", "Abcdef1!", "Abcdef1!", true)
            .await;
        assert!(outcome.success);

        // No bearer token yet; the row is created on first sign-in.
        assert!(datastore.upserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_validates_email_first() {
        let (_, controller) = controller();

        let outcome = controller.handle_reset("nope").await;
        assert!(!outcome.success);

        let outcome = controller.handle_reset("ada@example.com").await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn sign_out_flips_navbar_in_place() {
        let (provider, controller) = controller();
        provider.sign_in_results.lock().unwrap().push_back(Ok(grant()));
        controller.handle_login("ada@example.com", "pw").await;

        let surface = RecordingSurface::default();
        let navbar = NavbarPresenter::new(surface.clone(), MountGate::open());

        controller.sign_out(&navbar).await;

        assert!(controller.sessions().store().load_session().is_none());
        let applied = surface.applied.lock().unwrap();
        assert_eq!(applied.last(), Some(&NavbarModel::SignedOut));
    }

    #[tokio::test]
    async fn reconcile_without_session_renders_signed_out() {
        let (_, controller) = controller();
        let surface = RecordingSurface::default();
        let navbar = NavbarPresenter::new(surface.clone(), MountGate::open());
        let profiles = ProfileSync::new(EmptyProfiles);

        let session = controller.reconcile(&profiles, &navbar).await;
        assert!(session.is_none());

        let applied = surface.applied.lock().unwrap();
        assert_eq!(applied.as_slice(), &[NavbarModel::SignedOut]);
    }

    #[tokio::test]
    async fn reconcile_with_session_renders_account_menu() {
        let (provider, controller) = controller();
        provider.sign_in_results.lock().unwrap().push_back(Ok(grant()));
        controller.handle_login("ada@example.com", "pw").await;

        let surface = RecordingSurface::default();
        let navbar = NavbarPresenter::new(surface.clone(), MountGate::open());
        let profiles = ProfileSync::new(EmptyProfiles);

        let session = controller.reconcile(&profiles, &navbar).await.unwrap();
        assert_eq!(session.user_id, "user-1");

        let applied = surface.applied.lock().unwrap();
        assert!(matches!(
            applied.last(),
            Some(NavbarModel::SignedIn { email, .. }) if email == "ada@example.com"
        ));
    }

    #[tokio::test]
    async fn session_is_shared_between_controller_calls() {
        let (provider, controller) = controller();
        provider.sign_in_results.lock().unwrap().push_back(Ok(grant()));
        controller.handle_login("ada@example.com", "pw").await;

        let restored = controller.sessions().current_session().await.unwrap();
        assert_eq!(restored.source, SessionSource::Restored);
        let expected = Utc::now().timestamp() + 3600;
        assert!((restored.expires_at - expected).abs() <= 2);
    }
}
