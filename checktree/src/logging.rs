//! Tracing setup for the `checktree` binary.
//!
//! Tracing is diagnostic output only: events go to stderr so that rendered
//! reports on stdout stay machine-readable with `--format json`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, falling back to `default_filter` when unset or invalid.
///
/// # Example
/// ```bash
/// RUST_LOG=checktree=debug checktree run checks.json
/// ```
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
