//! Core types, configuration, and utilities for the Mailsfinder account client.

mod config;
mod error;
mod logging;
mod paths;
pub mod validate;

pub use config::{
    Config, DEFAULT_COOKIE_DOMAIN, DEFAULT_DASHBOARD_URL, DEFAULT_LOG_LEVEL, DEFAULT_SUPABASE_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
