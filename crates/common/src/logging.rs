//! Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Install the global tracing subscriber.
///
/// A `RUST_LOG` environment variable overrides the configured level.
/// JSON output is for log shippers; the plain format targets interactive
/// use. Per-cycle events (skipped cycles, dropped frames) log at debug,
/// so the default "info" level stays quiet while streaming.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}
