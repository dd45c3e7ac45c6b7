//! OSS Core - Backend logic for obs-stream-sync
//!
//! This crate contains all business logic with zero terminal dependencies:
//! the delay synchronization engine, the obs-websocket v5 client, screenshot
//! capture/decoding, and delay application. It can be used by the CLI or
//! embedded in another front end.

pub mod apply;
pub mod aspect;
pub mod capture;
pub mod config;
pub mod cycle;
pub mod decode;
pub mod format;
pub mod logging;
pub mod models;
pub mod obs;
pub mod snapshot;
pub mod sources;
pub mod sync;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
