//! Delay application: write the engine's offsets back into OBS.
//!
//! Offsets are rounded to whole milliseconds here because the audio sync
//! offset does not accept fractions. Per-feed failures are collected and
//! reported; they never abort the batch.

use serde_json::json;
use tracing::debug;

use crate::models::{SourceState, SyncedTimestamp};
use crate::obs::{ObsClient, ObsError, VIDEO_DELAY_FILTER_KIND};

/// Filter name used when a feed has no video-delay filter yet.
pub const DEFAULT_VIDEO_FILTER_NAME: &str = "Video Delay (Async)";

/// One planned write: feed name and the whole-millisecond delay to set.
pub type PlannedDelay = (String, i64);

/// Decide which feeds get which delay from a finished sync run.
///
/// Skips inactive feeds, feeds without a computed offset, and offsets that
/// are not finite numbers.
pub fn plan_sync_delays(
    sources: &[SourceState],
    synced: &[SyncedTimestamp],
) -> Vec<PlannedDelay> {
    sources
        .iter()
        .filter(|source| source.active)
        .filter_map(|source| {
            let offset = synced
                .iter()
                .find(|entry| entry.name == source.name)?
                .offset_ms?;
            if !offset.is_finite() {
                return None;
            }
            Some((source.name.clone(), offset.round() as i64))
        })
        .collect()
}

/// A zero-delay plan for every active feed.
pub fn plan_reset(sources: &[SourceState]) -> Vec<PlannedDelay> {
    sources
        .iter()
        .filter(|source| source.active)
        .map(|source| (source.name.clone(), 0))
        .collect()
}

/// What one successful write changed.
#[derive(Debug, Clone)]
pub struct AppliedDelay {
    pub name: String,
    /// Audio offset before the write, in milliseconds.
    pub previous_audio_ms: f64,
    /// Video filter delay before the write, in milliseconds.
    pub previous_video_ms: f64,
    /// The delay that was set on both paths.
    pub delay_ms: i64,
}

/// Set one feed's audio sync offset and video-delay filter.
///
/// The audio path is probed first; inputs without an audio track simply
/// skip that half. A missing video-delay filter is created under
/// [`DEFAULT_VIDEO_FILTER_NAME`].
pub async fn set_source_delay(
    client: &ObsClient,
    source: &SourceState,
    delay_ms: i64,
) -> Result<AppliedDelay, ObsError> {
    match client.get_input_audio_sync_offset(&source.name).await {
        Ok(_) => {
            client
                .set_input_audio_sync_offset(&source.name, delay_ms)
                .await?;
        }
        Err(e) => debug!("{} has no audio sync offset: {e}", source.name),
    }

    let filter_name = match &source.video_filter_name {
        Some(name) => name.clone(),
        None => {
            client
                .create_source_filter(
                    &source.name,
                    DEFAULT_VIDEO_FILTER_NAME,
                    VIDEO_DELAY_FILTER_KIND,
                    json!({ "delay_ms": delay_ms }),
                )
                .await?;
            DEFAULT_VIDEO_FILTER_NAME.to_string()
        }
    };
    client
        .set_source_filter_settings(&source.name, &filter_name, json!({ "delay_ms": delay_ms }))
        .await?;

    Ok(AppliedDelay {
        name: source.name.clone(),
        previous_audio_ms: source.audio_delay,
        previous_video_ms: source.video_delay,
        delay_ms,
    })
}

/// Apply a plan feed by feed, collecting per-feed outcomes.
pub async fn apply_delays(
    client: &ObsClient,
    sources: &[SourceState],
    plan: &[PlannedDelay],
) -> Vec<Result<AppliedDelay, (String, ObsError)>> {
    let mut outcomes = Vec::with_capacity(plan.len());
    for (name, delay_ms) in plan {
        let Some(source) = sources.iter().find(|s| &s.name == name) else {
            continue;
        };
        let outcome = set_source_delay(client, source, *delay_ms)
            .await
            .map_err(|e| (name.clone(), e));
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, active: bool) -> SourceState {
        SourceState {
            name: name.to_string(),
            active,
            audio_delay: 0.0,
            video_delay: 0.0,
            screenshot_delay: None,
            video_filter_name: None,
        }
    }

    fn synced(name: &str, offset_ms: Option<f64>) -> SyncedTimestamp {
        SyncedTimestamp {
            name: name.to_string(),
            ms: 1_000.0,
            visual_offset_ms: offset_ms.map(|_| 0.0),
            offset_ms,
            screenshot_delay_ms: 0.0,
        }
    }

    #[test]
    fn plan_rounds_offsets_to_whole_milliseconds() {
        let sources = vec![source("A", true)];
        let entries = vec![synced("A", Some(2355.392578125))];
        assert_eq!(plan_sync_delays(&sources, &entries), vec![("A".to_string(), 2355)]);
    }

    #[test]
    fn plan_skips_inactive_missing_and_nonfinite() {
        let sources = vec![
            source("hidden", false),
            source("no-offset", true),
            source("nan", true),
            source("good", true),
        ];
        let entries = vec![
            synced("hidden", Some(10.0)),
            synced("no-offset", None),
            synced("nan", Some(f64::NAN)),
            synced("good", Some(0.4)),
        ];
        assert_eq!(plan_sync_delays(&sources, &entries), vec![("good".to_string(), 0)]);
    }

    #[test]
    fn plan_skips_feeds_without_a_sync_entry() {
        let sources = vec![source("A", true), source("B", true)];
        let entries = vec![synced("A", Some(5.0))];
        assert_eq!(plan_sync_delays(&sources, &entries), vec![("A".to_string(), 5)]);
    }

    #[test]
    fn reset_targets_every_active_feed() {
        let sources = vec![source("A", true), source("B", false), source("C", true)];
        assert_eq!(
            plan_reset(&sources),
            vec![("A".to_string(), 0), ("C".to_string(), 0)]
        );
    }
}
