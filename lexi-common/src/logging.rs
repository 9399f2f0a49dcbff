//! Tracing subscriber initialisation

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. "info" or
/// "lexi_import=debug,tower_http=info") is used.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A second initialisation (tests, embedding) is not an error
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
