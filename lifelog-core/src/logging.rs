//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Install a global fmt subscriber
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this more than
/// once is harmless; only the first call installs a subscriber.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Install the subscriber using the configured default filter
pub fn init_from_config(config: &AppConfig) {
    init_tracing(&config.log_filter);
}
