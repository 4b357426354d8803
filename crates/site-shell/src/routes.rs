//! Site routes and the dashboard handoff URL.

use anyhow::Result;
use credential_store::{Session, UserProfile};
use url::Url;

/// Pages the controller can redirect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Landing page (index.html)
    Home,
    /// Sign-in page (login.html)
    Login,
    /// Registration page (signup.html)
    Signup,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "index.html",
            Route::Login => "login.html",
            Route::Signup => "signup.html",
        }
    }
}

/// Build the dashboard handoff URL.
///
/// The dashboard is a separate application on another subdomain; it gets
/// the session and a profile summary as query parameters so it can boot
/// without a second round trip.
pub fn dashboard_handoff_url(
    dashboard_url: &str,
    session: &Session,
    profile: Option<&UserProfile>,
) -> Result<Url> {
    let mut url = Url::parse(dashboard_url)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("access_token", &session.access_token)
            .append_pair("refresh_token", &session.refresh_token)
            .append_pair("user_id", &session.user_id)
            .append_pair("email", &session.email);
        if let Some(profile) = profile {
            pairs
                .append_pair("plan", &profile.plan)
                .append_pair("credits_find", &profile.credits_find.to_string())
                .append_pair("credits_verify", &profile.credits_verify.to_string());
        }
    }
    Ok(url)
}
