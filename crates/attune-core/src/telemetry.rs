//! Tracing subscriber bootstrap.
//!
//! Binaries and integration tests call [`init`] once at startup; the
//! `RUST_LOG` environment variable overrides the configured level.

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
