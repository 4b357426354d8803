//! Session lifecycle for the Mailsfinder account client: sign-in,
//! sign-up, restore-with-refresh, and sign-out, tracked by an explicit
//! state machine and announced over a typed event bus.

mod auth_fsm;
mod error;
mod events;
mod provider;
mod session;
mod supabase;

pub use auth_fsm::{RefreshConfig, SessionState};
pub use error::{AuthError, AuthResult};
pub use events::{AuthEvent, EventBus, SubscriptionToken};
pub use provider::{IdentityProvider, SignUpGrant, TokenGrant};
pub use session::{MessageOutcome, SessionManager, SignInOutcome, SignUpOutcome};
pub use supabase::SupabaseAuth;
