//! Tracing setup for binaries and demos embedding the engine.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` when set, defaulting to `info` for
/// this crate. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pipelab=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
