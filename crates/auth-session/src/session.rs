//! Session management with automatic token refresh using FSM-based state
//! tracking.
//!
//! The FSM tracks transient states (authenticating, refreshing, signing
//! out) that are never persisted, while the session data itself lives in
//! the credential store. Fallible user-facing operations return outcome
//! values rather than errors: the caller always gets a message to show and
//! any follow-up affordances, whatever went wrong underneath.

use crate::auth_fsm::{RefreshConfig, SessionMachine, SessionMachineInput, SessionState};
use crate::events::{AuthEvent, EventBus};
use crate::provider::IdentityProvider;
use crate::{AuthError, AuthResult};
use chrono::{Duration, Utc};
use credential_store::{CredentialStore, Session, SessionSource};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Result of a sign-in attempt.
#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub success: bool,
    /// User-facing message
    pub message: String,
    /// Whether offering "resend confirmation email" makes sense
    pub resend_available: bool,
    pub session: Option<Session>,
}

impl SignInOutcome {
    fn success(message: &str, session: Session) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            resend_available: false,
            session: Some(session),
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            resend_available: false,
            session: None,
        }
    }
}

/// Result of a registration attempt.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub success: bool,
    pub message: String,
    /// True when the user must confirm their email before signing in
    pub confirmation_required: bool,
    pub session: Option<Session>,
}

/// Result of a fire-and-forget request (password reset, resend).
#[derive(Debug, Clone)]
pub struct MessageOutcome {
    pub success: bool,
    pub message: String,
}

/// Session manager: the single owner of session state.
///
/// All sign-in, sign-up, restore, refresh, and sign-out paths go through
/// here so the FSM, the credential store, and the event bus stay
/// consistent with each other.
pub struct SessionManager<P: IdentityProvider> {
    provider: P,
    store: CredentialStore,
    fsm: Mutex<SessionMachine>,
    refresh_config: RefreshConfig,
    events: Arc<EventBus>,
}

impl<P: IdentityProvider> SessionManager<P> {
    pub fn new(provider: P, store: CredentialStore) -> Self {
        Self::with_refresh_config(provider, store, RefreshConfig::default())
    }

    pub fn with_refresh_config(
        provider: P,
        store: CredentialStore,
        refresh_config: RefreshConfig,
    ) -> Self {
        Self {
            provider,
            store,
            fsm: Mutex::new(SessionMachine::new()),
            refresh_config,
            events: Arc::new(EventBus::new()),
        }
    }

    /// The event bus session events are published on.
    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Current FSM state.
    pub fn state(&self) -> SessionState {
        let fsm = self.fsm.lock().unwrap();
        SessionState::from(fsm.state())
    }

    /// Transition the FSM and publish a state-change event if the state
    /// actually changed.
    fn transition(&self, input: &SessionMachineInput) -> AuthResult<SessionState> {
        let mut fsm = self.fsm.lock().unwrap();
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
            let (user_id, email) = self
                .store
                .load_stale_session()
                .map(|s| (Some(s.user_id), Some(s.email)))
                .unwrap_or((None, None));
            self.events.publish(AuthEvent::StateChanged {
                state: new_state.clone(),
                user_id,
                email,
            });
        }

        Ok(new_state)
    }

    fn session_from_grant(
        grant: crate::provider::TokenGrant,
        fallback_email: &str,
        source: SessionSource,
    ) -> Session {
        let expires_at = Utc::now() + Duration::seconds(grant.expires_in);
        Session {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            user_id: grant.user_id,
            email: grant.email.unwrap_or_else(|| fallback_email.to_string()),
            expires_at: expires_at.timestamp(),
            source,
        }
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save_session(session) {
            // The session still works for this run; it just won't survive
            // a restart.
            warn!("Session could not be persisted: {}", e);
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> SignInOutcome {
        if self.transition(&SessionMachineInput::SignInRequested).is_err() {
            return SignInOutcome::failure("Another sign-in is already in progress.");
        }

        match self.provider.sign_in(email, password).await {
            Ok(grant) => {
                let session = Self::session_from_grant(grant, email, SessionSource::Issued);
                self.persist(&session);
                let _ = self.transition(&SessionMachineInput::SessionIssued);
                self.events.publish(AuthEvent::SignedIn {
                    user_id: session.user_id.clone(),
                    email: Some(session.email.clone()),
                });
                info!(user_id = %session.user_id, "Sign-in successful");
                SignInOutcome::success("Login successful! Redirecting...", session)
            }
            Err(AuthError::EmailNotConfirmed) => {
                let _ = self.transition(&SessionMachineInput::AttemptFailed);
                SignInOutcome {
                    resend_available: true,
                    ..SignInOutcome::failure(
                        "Please confirm your email address before signing in.",
                    )
                }
            }
            Err(e) if e.is_transient() => {
                warn!("Sign-in failed with transient error: {}", e);
                let _ = self.transition(&SessionMachineInput::AttemptFailed);
                SignInOutcome::failure("Something went wrong. Please try again.")
            }
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                let _ = self.transition(&SessionMachineInput::AttemptFailed);
                SignInOutcome::failure("Invalid email or password.")
            }
        }
    }

    /// Register a new account.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> SignUpOutcome {
        if self.transition(&SessionMachineInput::SignInRequested).is_err() {
            return SignUpOutcome {
                success: false,
                message: "Another sign-in is already in progress.".to_string(),
                confirmation_required: false,
                session: None,
            };
        }

        match self.provider.sign_up(email, password, full_name).await {
            Ok(grant) if grant.confirmation_required => {
                let _ = self.transition(&SessionMachineInput::AttemptFailed);
                info!(user_id = %grant.user_id, "Account created, confirmation pending");
                SignUpOutcome {
                    success: true,
                    message: "Account created! Please check your email to confirm your account."
                        .to_string(),
                    confirmation_required: true,
                    session: None,
                }
            }
            Ok(grant) => {
                let session = grant
                    .grant
                    .map(|g| Self::session_from_grant(g, email, SessionSource::Issued));
                let Some(session) = session else {
                    // Provider said no confirmation needed but sent no
                    // tokens; treat it like pending confirmation.
                    let _ = self.transition(&SessionMachineInput::AttemptFailed);
                    return SignUpOutcome {
                        success: true,
                        message: "Account created! Please sign in.".to_string(),
                        confirmation_required: true,
                        session: None,
                    };
                };
                self.persist(&session);
                let _ = self.transition(&SessionMachineInput::SessionIssued);
                self.events.publish(AuthEvent::SignedIn {
                    user_id: session.user_id.clone(),
                    email: Some(session.email.clone()),
                });
                info!(user_id = %session.user_id, "Account created and signed in");
                SignUpOutcome {
                    success: true,
                    message: "Account created! Redirecting...".to_string(),
                    confirmation_required: false,
                    session: Some(session),
                }
            }
            Err(e) => {
                warn!("Sign-up failed: {}", e);
                let _ = self.transition(&SessionMachineInput::AttemptFailed);
                let message = if e.is_transient() {
                    "Something went wrong. Please try again."
                } else {
                    "Could not create the account. The email may already be registered."
                };
                SignUpOutcome {
                    success: false,
                    message: message.to_string(),
                    confirmation_required: false,
                    session: None,
                }
            }
        }
    }

    /// Restore the current session, refreshing it if the access token is
    /// expired.
    ///
    /// Makes at most one refresh decision per call; transient provider
    /// errors inside that refresh are retried with backoff. A refresh that
    /// ultimately fails clears the stored session, so the next call starts
    /// from nothing instead of retrying a dead refresh token forever.
    pub async fn current_session(&self) -> Option<Session> {
        if let Some(session) = self.store.load_session() {
            let _ = self.transition(&SessionMachineInput::SessionRestored);
            debug!(user_id = %session.user_id, "Session restored from storage");
            return Some(session);
        }

        // The live load came back empty; an expired record may still be
        // inside the backup window and refreshable.
        let session = self.store.load_stale_session()?;

        info!(user_id = %session.user_id, "Stored session expired, attempting refresh");
        if self.transition(&SessionMachineInput::ExpiryImminent).is_err() {
            // Already refreshing or signing out elsewhere.
            return None;
        }

        match self.refresh_with_backoff(&session).await {
            Ok(refreshed) => Some(refreshed),
            Err(e) => {
                warn!("Session refresh failed, session cleared: {}", e);
                None
            }
        }
    }

    /// Refresh the session with exponential backoff retry.
    ///
    /// Expects the FSM to already be in Refreshing. On failure the stored
    /// session is cleared.
    async fn refresh_with_backoff(&self, session: &Session) -> AuthResult<Session> {
        let mut last_error = None;

        for attempt in 0..self.refresh_config.max_retries {
            match self.provider.refresh(&session.refresh_token).await {
                Ok(grant) => {
                    let refreshed = Self::session_from_grant(
                        grant,
                        &session.email,
                        SessionSource::Refreshed,
                    );
                    self.persist(&refreshed);
                    let _ = self.transition(&SessionMachineInput::RefreshSucceeded);
                    self.events.publish(AuthEvent::SessionRefreshed {
                        user_id: refreshed.user_id.clone(),
                    });
                    info!(user_id = %refreshed.user_id, "Token refreshed successfully");
                    return Ok(refreshed);
                }
                Err(e) if e.is_transient() => {
                    last_error = Some(e);

                    if attempt + 1 < self.refresh_config.max_retries {
                        let _ = self.transition(&SessionMachineInput::RefreshRetry);

                        let delay = self.refresh_config.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries = self.refresh_config.max_retries,
                            delay_ms = delay.as_millis(),
                            "Refresh failed with transient error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!("Refresh failed with non-transient error: {}", e);
                    let _ = self.store.clear_session();
                    let _ = self.transition(&SessionMachineInput::RefreshFailed);
                    return Err(e);
                }
            }
        }

        warn!(
            "Refresh failed after {} attempts",
            self.refresh_config.max_retries
        );
        let _ = self.store.clear_session();
        let _ = self.transition(&SessionMachineInput::RefreshFailed);

        Err(last_error.unwrap_or(AuthError::RefreshExhausted(self.refresh_config.max_retries)))
    }

    /// Sign out: revoke the session server-side if possible, then clear
    /// local state. Always succeeds locally; safe to call when already
    /// signed out.
    pub async fn sign_out(&self) {
        let _ = self.transition(&SessionMachineInput::SignOutRequested);

        // An expired session is still revoked server-side.
        if let Some(session) = self.store.load_stale_session() {
            if let Err(e) = self.provider.sign_out(&session.access_token).await {
                // Local state is cleared regardless.
                warn!("Server-side sign-out failed: {}", e);
            }
        }

        let _ = self.store.clear_session();
        let _ = self.transition(&SessionMachineInput::SignOutComplete);
        self.events.publish(AuthEvent::SignedOut);
        info!("Signed out");
    }

    /// Request a password reset email.
    pub async fn reset_password(&self, email: &str) -> MessageOutcome {
        match self.provider.request_password_reset(email).await {
            Ok(()) => MessageOutcome {
                success: true,
                message: "Password reset link sent! Check your email.".to_string(),
            },
            Err(e) => {
                warn!("Password reset request failed: {}", e);
                MessageOutcome {
                    success: false,
                    message: "Could not send the reset email. Please try again.".to_string(),
                }
            }
        }
    }

    /// Resend the confirmation email for an unconfirmed account.
    pub async fn resend_confirmation(&self, email: &str) -> MessageOutcome {
        match self.provider.resend_confirmation(email).await {
            Ok(()) => MessageOutcome {
                success: true,
                message: "Confirmation email sent! Check your inbox.".to_string(),
            },
            Err(e) => {
                warn!("Resend confirmation failed: {}", e);
                MessageOutcome {
                    success: false,
                    message: "Could not send the confirmation email. Please try again."
                        .to_string(),
                }
            }
        }
    }

    /// Direct access to the credential store (profile cache reads).
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }
}
