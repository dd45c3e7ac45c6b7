//! Delay synchronization engine.
//!
//! This module is the single source of truth for delay math: it turns the
//! decoded per-feed timestamps and the mixer's current delay state into the
//! corrective offsets the applier writes back. No other module adds or
//! subtracts delays.
//!
//! The engine is a pure value-returning transformation. It performs no I/O,
//! holds no state between calls, and is safe to invoke concurrently on
//! disjoint inputs. Diagnostics go through an explicit [`SyncLogger`] handle
//! that defaults to a no-op.

mod engine;
mod quantize;

pub use engine::{synchronize, SyncError, SyncOptions, SyncResult};
pub use quantize::quantize;

/// Sink for the engine's diagnostic trace (chosen baseline, least-delayed
/// source, anchor). Implementations must not fail.
pub trait SyncLogger {
    fn debug(&self, message: &str);
}

/// Forwards engine diagnostics to the `tracing` ecosystem.
pub struct TracingSyncLogger;

impl SyncLogger for TracingSyncLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
}
