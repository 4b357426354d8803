//! Navbar render model.

use credential_store::{Session, UserProfile};

/// Everything the navbar needs to draw itself.
#[derive(Debug, Clone, PartialEq)]
pub enum NavbarModel {
    /// Sign-in and sign-up links.
    SignedOut,
    /// Account menu with identity, plan, and credit balances.
    SignedIn {
        email: String,
        display_name: String,
        /// None while the profile has not loaded yet
        plan: Option<String>,
        credits_find: Option<i64>,
        credits_verify: Option<i64>,
    },
}

impl NavbarModel {
    /// Build the signed-in model. Without a profile the navbar still
    /// shows the account menu, just without plan or credit figures.
    pub fn signed_in(session: &Session, profile: Option<&UserProfile>) -> Self {
        let display_name = profile
            .and_then(|p| p.full_name.clone())
            .unwrap_or_else(|| {
                session
                    .email
                    .split('@')
                    .next()
                    .unwrap_or(&session.email)
                    .to_string()
            });

        NavbarModel::SignedIn {
            email: session.email.clone(),
            display_name,
            plan: profile.map(|p| p.plan.clone()),
            credits_find: profile.map(|p| p.credits_find),
            credits_verify: profile.map(|p| p.credits_verify),
        }
    }
}

/// A surface the navbar model is rendered onto.
pub trait NavbarSurface: Send + Sync {
    fn apply(&self, model: &NavbarModel);
}
