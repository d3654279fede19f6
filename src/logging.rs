//! Tracing initialisation.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber: compact lines on stderr, `info` by
/// default with debug output for this crate. `RUST_LOG` overrides it.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aeo_visibility=debug,aeo=debug"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();

    tracing::debug!("Tracing initialized");
}
