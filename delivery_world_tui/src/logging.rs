//! Diagnostics for the viewer and the benchmark.
//!
//! Events go to stderr so they never mix with the benchmark summary on
//! stdout. While the terminal UI is running stderr shares the alternate
//! screen, so keep `RUST_LOG` at `warn` or redirect stderr to a file.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=delivery_world_core=debug cargo run -- --runs 20 2> search.log
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
