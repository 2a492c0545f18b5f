//! # Logging Setup
//!
//! One tracing subscriber for the whole process. Honors `RUST_LOG` when
//! set; otherwise defaults to `info`, or `debug` when verbose output is
//! requested.

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Safe to call more than once; later calls are ignored, which keeps test
/// binaries from panicking when several tests initialize logging.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}
