//! Logging initialization for the account client.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// Sets up a compact tracing subscriber with the log level taken from the
/// RUST_LOG env var or the provided default.
///
/// # Arguments
///
/// * `level` - Default log level (trace, debug, info, warn, error)
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Client started");
/// ```
pub fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(true)
        .compact()
        .init();
}
