//! Command implementations.

pub mod account;
pub mod auth;

use crate::controller::PageController;
use crate::output::OutputFormat;
use anyhow::Result;
use auth_session::{SessionManager, SupabaseAuth};
use credential_store::{CookieFileStore, CredentialStore, FileStore};
use profile_sync::{ProfileSync, SupabaseProfiles};
use site_core::{Config, Paths};
use tracing::debug;

/// A failure with a message meant for the user as-is.
///
/// Anything else reaching the outermost handler is treated as unexpected
/// and triggers the defensive credential purge.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UserError(pub String);

/// Everything a command needs, wired once at startup.
///
/// The credential store writes to two places: the JSON file is the primary
/// and the cookie file mirrors it under the parent site domain.
pub struct AppContext {
    pub config: Config,
    pub controller: PageController<SupabaseAuth>,
    pub profiles: ProfileSync<SupabaseProfiles>,
    pub format: OutputFormat,
}

impl AppContext {
    pub fn init(format: OutputFormat) -> Result<Self> {
        let paths = Paths::new()?;
        paths.ensure_dirs()?;
        let config = Config::load(&paths)?;

        let primary = FileStore::new(paths.credentials_file());
        let mirror = CookieFileStore::new(paths.cookies_file(), &config.cookie_domain);
        let store = CredentialStore::new(Box::new(primary), Box::new(mirror));

        let provider = SupabaseAuth::new(&config.supabase_url, &config.supabase_publishable_key);
        let controller = PageController::new(SessionManager::new(provider, store));
        controller
            .sessions()
            .events()
            .subscribe(|event| debug!(?event, "Auth event"));

        let datastore = SupabaseProfiles::new(
            config.supabase_url.clone(),
            config.supabase_publishable_key.clone(),
        );
        let profiles = ProfileSync::new(datastore);

        Ok(Self {
            config,
            controller,
            profiles,
            format,
        })
    }
}
