//! Profile rows for Mailsfinder accounts: creation with free-plan
//! defaults, cached reads, partial updates, and atomic credit spends.

mod error;
mod postgrest;
mod store;
mod sync;

pub use error::{ProfileError, ProfileResult};
pub use postgrest::SupabaseProfiles;
pub use store::{CreditKind, ProfileStore, ProfileUpdate};
pub use sync::ProfileSync;
