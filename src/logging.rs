//! Diagnostic logging setup.
//!
//! Diagnostics go through `tracing` to **stderr**; command output stays on
//! stdout so it can be piped. The filter comes from `RUST_LOG` when set,
//! otherwise from `[logging].filter` in the config.

use tracing_subscriber::{prelude::*, EnvFilter};

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init();

    if result.is_err() {
        tracing::debug!("tracing already initialized, skipping re-initialization");
    }
}
