//! Logging infrastructure for obs-stream-sync.
//!
//! The tool logs operator-facing diagnostics through the `tracing`
//! ecosystem; the engine's own trace goes through the explicit
//! [`SyncLogger`](crate::sync::SyncLogger) handle so it stays testable
//! without global state.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` when set; otherwise logs at `info`, or `debug` when
/// the config enables it. Should be called once at application startup.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
