//! Session state machine using rust-fsm.
//!
//! Authentication state is tracked by an explicit finite state machine
//! instead of being derived from what happens to be in storage.
//!
//! ## State Diagram
//!
//! ```text
//! ┌──────────────────┐
//! │  Unauthenticated │ (initial)
//! └────────┬─────────┘
//!          │ SignInRequested          SessionRestored
//!          ▼                          (straight to Authenticated)
//! ┌──────────────────┐
//! │  Authenticating  │
//! └────────┬─────────┘
//!          │ SessionIssued / AttemptFailed
//!          ▼
//! ┌──────────────────┐   ExpiryImminent   ┌──────────────────┐
//! │  Authenticated   │ ─────────────────► │    Refreshing    │
//! └────────┬─────────┘                    └────────┬─────────┘
//!          │ SignOutRequested                      │ RefreshSucceeded / RefreshFailed
//!          ▼                                       ▼
//! ┌──────────────────┐                    Authenticated / Unauthenticated
//! │    SigningOut    │
//! └────────┬─────────┘
//!          │ SignOutComplete
//!          ▼
//!     Unauthenticated
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Generates a module `session_machine` with State, Input, and the
// StateMachine type alias.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Unauthenticated)

    Unauthenticated => {
        SignInRequested => Authenticating,
        // A stored session with a live token restores directly
        SessionRestored => Authenticated,
        // A stored session with a dead token goes through refresh
        ExpiryImminent => Refreshing
    },
    Authenticating => {
        SessionIssued => Authenticated,
        AttemptFailed => Unauthenticated
    },
    Authenticated => {
        ExpiryImminent => Refreshing,
        SignOutRequested => SigningOut
    },
    Refreshing => {
        RefreshSucceeded => Authenticated,
        RefreshRetry => Refreshing,
        RefreshFailed => Unauthenticated
    },
    SigningOut => {
        SignOutComplete => Unauthenticated
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session.
    Unauthenticated,
    /// Credentials submitted, waiting on the identity provider.
    Authenticating,
    /// Signed in with a valid session.
    Authenticated,
    /// Exchanging the refresh token for a new access token.
    Refreshing,
    /// Sign-out in progress.
    SigningOut,
}

impl SessionState {
    /// Returns true if the user has a valid session (Authenticated only).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// Returns true if the state is a transient/in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticating | SessionState::Refreshing | SessionState::SigningOut
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unauthenticated => SessionState::Unauthenticated,
            SessionMachineState::Authenticating => SessionState::Authenticating,
            SessionMachineState::Authenticated => SessionState::Authenticated,
            SessionMachineState::Refreshing => SessionState::Refreshing,
            SessionMachineState::SigningOut => SessionState::SigningOut,
        }
    }
}

/// Configuration for retry behavior during token refresh.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RefreshConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms.saturating_mul(2u64.pow(attempt));
        let capped_ms = delay_ms.min(self.max_delay_ms);
        Duration::from_millis(capped_ms)
    }
}
