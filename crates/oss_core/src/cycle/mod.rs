//! One sync cycle: collect -> capture -> decode -> synchronize.
//!
//! The engine is invoked at most once per cycle, and only after every
//! capture has completed with its latency recorded - the compensation pass
//! depends on accurate figures. A cycle aborted before the engine runs
//! leaves nothing to roll back.

use thiserror::Error;

use crate::capture::{capture_screenshots, CapturedFrame};
use crate::config::Settings;
use crate::decode::{decode_timestamps, TimestampDecoder};
use crate::models::{SourceState, SyncedTimestamp};
use crate::obs::{ObsClient, ObsError};
use crate::sources::collect_sources;
use crate::sync::{synchronize, SyncError, SyncOptions, TracingSyncLogger};

/// Errors from a sync cycle.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Obs(#[from] ObsError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The configured scene holds no media sources (or the selection
    /// filtered them all out).
    #[error("no feeds found in scene '{scene}'")]
    NoSources { scene: String },
}

/// Everything a finished cycle produced, for reporting, optional
/// screenshot persistence, and delay application.
#[derive(Debug)]
pub struct SyncCycle {
    pub sources: Vec<SourceState>,
    pub synced: Vec<SyncedTimestamp>,
    pub frames: Vec<CapturedFrame>,
}

/// Run one capture-and-compute cycle. Applying the result is the caller's
/// decision.
///
/// `only` restricts the run to the named feeds (the `sync_to` target is
/// always kept); `None` runs against every feed in the scene.
pub async fn run_sync_cycle(
    client: &ObsClient,
    settings: &Settings,
    decoder: &dyn TimestampDecoder,
    sync_to: Option<&str>,
    only: Option<&[String]>,
) -> Result<SyncCycle, CycleError> {
    let mut sources = collect_sources(client, &settings.obs).await?;

    if let Some(names) = only {
        sources.retain(|source| {
            names.iter().any(|n| n == &source.name) || sync_to == Some(source.name.as_str())
        });
    }
    if sources.is_empty() {
        return Err(CycleError::NoSources {
            scene: settings.obs.sources_scene.clone(),
        });
    }

    let frames = capture_screenshots(client, &mut sources, &settings.image).await?;
    let timestamps = decode_timestamps(&frames, &settings.image, decoder);

    let options = SyncOptions {
        sync_to,
        round_to_framerate: settings
            .sync
            .round_to_framerate
            .then_some(settings.sync.framerate),
        logger: Some(&TracingSyncLogger),
    };
    let synced = synchronize(&sources, &timestamps, &options)?;

    Ok(SyncCycle {
        sources,
        synced,
        frames,
    })
}
