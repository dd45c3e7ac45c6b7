//! The synchronization algorithm: timestamps plus current delay state in,
//! corrective offsets out.

use thiserror::Error;

use super::quantize::quantize;
use super::SyncLogger;
use crate::format::format_ms;
use crate::models::{FeedTimestamp, SourceState, SyncedTimestamp};

/// Errors local to one engine invocation. None of these are retryable with
/// the same input; the caller must re-capture and re-decode first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Every entry was a decode-failure sentinel; nothing to synchronize.
    #[error("no feed produced a usable timestamp")]
    NoValidInput,

    /// The requested sync target has no usable timestamp, or auto-selection
    /// found no entry with a defined offset. When the target was named
    /// explicitly there is deliberately no fallback to auto-selection.
    #[error("no usable synchronization anchor{}", .requested.as_ref().map(|n| format!(": '{n}' has no usable timestamp")).unwrap_or_default())]
    AnchorNotFound { requested: Option<String> },

    /// No source overlaps the decoded timestamps by name, so there is no
    /// delay reference to measure against.
    #[error("no known source matches a decoded timestamp")]
    NoDelayReference,
}

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Options for one engine invocation.
#[derive(Default, Clone, Copy)]
pub struct SyncOptions<'a> {
    /// Pin the final zero-point to this source instead of auto-selecting
    /// the entry with the least offset.
    pub sync_to: Option<&'a str>,
    /// Quantize final offsets to whole frame durations at this rate (Hz).
    /// Ignored unless positive.
    pub round_to_framerate: Option<f64>,
    /// Diagnostic sink; `None` disables the trace entirely.
    pub logger: Option<&'a dyn SyncLogger>,
}

impl<'a> SyncOptions<'a> {
    fn debug(&self, message: impl FnOnce() -> String) {
        if let Some(logger) = self.logger {
            logger.debug(&message());
        }
    }
}

/// Compute corrective delay offsets for a set of feeds.
///
/// Entries with `ms <= 0` are decode-failure sentinels: they pass through
/// with `ms` untouched and no offsets, acquiring only their capture latency.
/// All arithmetic stays in floating point; rounding to whole milliseconds is
/// the applier's job.
///
/// The returned list has the same length and order as `timestamps`; no
/// entries are added or removed.
pub fn synchronize(
    sources: &[SourceState],
    timestamps: &[FeedTimestamp],
    options: &SyncOptions<'_>,
) -> SyncResult<Vec<SyncedTimestamp>> {
    // Attach capture latency to every entry, valid or not.
    let mut entries: Vec<SyncedTimestamp> = timestamps
        .iter()
        .map(|t| SyncedTimestamp {
            name: t.name.clone(),
            ms: t.ms,
            visual_offset_ms: None,
            offset_ms: None,
            screenshot_delay_ms: sources
                .iter()
                .find(|s| s.name == t.name)
                .and_then(|s| s.screenshot_delay)
                .unwrap_or(0.0),
        })
        .collect();

    // Only entries with a decoded timestamp participate; a feed with a
    // failed decode must not skew the calculation.
    let valid: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.ms > 0.0)
        .map(|(i, _)| i)
        .collect();
    if valid.is_empty() {
        return Err(SyncError::NoValidInput);
    }

    // Compensate capture latency: a slower-to-capture feed shows a later
    // timestamp than it had when the capture pass began.
    for &i in &valid {
        let entry = &mut entries[i];
        entry.ms -= entry.screenshot_delay_ms;
    }

    // Baseline: the most-behind feed. Linear scan, strictly-better
    // replacement, so ties resolve to the first-listed entry.
    let mut baseline = valid[0];
    for &i in &valid[1..] {
        if entries[i].ms < entries[baseline].ms {
            baseline = i;
        }
    }
    let baseline_ms = entries[baseline].ms;
    options.debug(|| {
        format!(
            "most behind timestamp: {} - {}",
            entries[baseline].name, baseline_ms
        )
    });

    for &i in &valid {
        let entry = &mut entries[i];
        entry.visual_offset_ms = Some(entry.ms - baseline_ms);
    }

    // The least-delayed source among those with a usable timestamp is the
    // reference point for existing delays.
    let mut least: Option<&SourceState> = None;
    for source in sources {
        if !valid.iter().any(|&i| entries[i].name == source.name) {
            continue;
        }
        match least {
            Some(current) if source.audio_delay >= current.audio_delay => {}
            _ => least = Some(source),
        }
    }
    let least = least.ok_or(SyncError::NoDelayReference)?;
    options.debug(|| {
        format!(
            "least added delay: {} - {}",
            least.name,
            format_ms(least.audio_delay)
        )
    });

    // Raw offsets: what each feed would need if delays were measured
    // relative to the least-delayed source. A valid entry without a
    // matching source contributes no video delay of its own.
    for &i in &valid {
        let video_delay = sources
            .iter()
            .find(|s| s.name == entries[i].name)
            .map(|s| s.video_delay)
            .unwrap_or(0.0);
        let entry = &mut entries[i];
        entry.offset_ms =
            Some(entry.visual_offset_ms.unwrap_or(0.0) + video_delay - least.audio_delay);
    }

    // Anchor selection: an explicit sync target wins; otherwise the entry
    // with the least raw offset. An undefined offset counts as +infinity
    // and is never chosen.
    let anchor = match options.sync_to {
        Some(name) => valid
            .iter()
            .copied()
            .find(|&i| entries[i].name == name)
            .ok_or_else(|| SyncError::AnchorNotFound {
                requested: Some(name.to_string()),
            })?,
        None => {
            let mut best: Option<usize> = None;
            for &i in &valid {
                let Some(offset) = entries[i].offset_ms else {
                    continue;
                };
                match best {
                    Some(b) if offset >= entries[b].offset_ms.unwrap_or(f64::INFINITY) => {}
                    _ => best = Some(i),
                }
            }
            best.ok_or(SyncError::AnchorNotFound { requested: None })?
        }
    };

    // Snapshot the scalar before normalization: the anchor is itself one of
    // the entries about to be rewritten.
    let anchor_offset = entries[anchor].offset_ms.unwrap_or(0.0);
    options.debug(|| {
        format!(
            "anchor: {} - {}",
            entries[anchor].name,
            format_ms(anchor_offset)
        )
    });

    // Normalize against the anchor; the anchor itself lands on exactly 0.
    for &i in &valid {
        let entry = &mut entries[i];
        entry.offset_ms = entry.offset_ms.map(|offset| offset - anchor_offset);
    }

    if let Some(rate) = options.round_to_framerate.filter(|rate| *rate > 0.0) {
        for &i in &valid {
            let entry = &mut entries[i];
            entry.offset_ms = entry.offset_ms.map(|offset| quantize(offset, rate));
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, audio: f64, video: f64, screenshot: f64) -> SourceState {
        SourceState {
            name: name.to_string(),
            active: true,
            audio_delay: audio,
            video_delay: video,
            screenshot_delay: Some(screenshot),
            video_filter_name: Some("Video Delay (Async)".to_string()),
        }
    }

    fn fixture_sources() -> Vec<SourceState> {
        vec![
            source("Static 1", 2295.0, 2295.0, 13.1795),
            source("Static 2", 0.0, 0.0, 26.5721),
            source("Static 3", 757.0, 757.0, 40.9752),
        ]
    }

    fn fixture_timestamps() -> Vec<FeedTimestamp> {
        vec![
            FeedTimestamp::new("Static 1", 1_684_006_697_435.87),
            FeedTimestamp::new("Static 2", 1_684_006_697_388.87),
            FeedTimestamp::new("Static 3", 1_684_006_696_971.87),
        ]
    }

    #[test]
    fn three_feed_fixture_matches_expected_offsets() {
        let result = synchronize(
            &fixture_sources(),
            &fixture_timestamps(),
            &SyncOptions::default(),
        )
        .unwrap();

        assert_eq!(result.len(), 3);

        assert_eq!(result[0].name, "Static 1");
        assert_eq!(result[0].ms, 1_684_006_697_422.6907);
        assert_eq!(result[0].visual_offset_ms, Some(491.795654296875));
        assert_eq!(result[0].offset_ms, Some(2_355.392578125));
        assert_eq!(result[0].screenshot_delay_ms, 13.1795);

        assert_eq!(result[1].name, "Static 2");
        assert_eq!(result[1].ms, 1_684_006_697_362.298);
        assert_eq!(result[1].visual_offset_ms, Some(431.403076171875));
        assert_eq!(result[1].offset_ms, Some(0.0));
        assert_eq!(result[1].screenshot_delay_ms, 26.5721);

        assert_eq!(result[2].name, "Static 3");
        assert_eq!(result[2].ms, 1_684_006_696_930.895);
        assert_eq!(result[2].visual_offset_ms, Some(0.0));
        assert_eq!(result[2].offset_ms, Some(325.596923828125));
        assert_eq!(result[2].screenshot_delay_ms, 40.9752);
    }

    #[test]
    fn anchor_lands_on_exact_zero() {
        let result = synchronize(
            &fixture_sources(),
            &fixture_timestamps(),
            &SyncOptions::default(),
        )
        .unwrap();
        assert_eq!(result[1].offset_ms, Some(0.0));
    }

    #[test]
    fn visual_offsets_are_non_negative_and_baseline_is_zero() {
        let result = synchronize(
            &fixture_sources(),
            &fixture_timestamps(),
            &SyncOptions::default(),
        )
        .unwrap();
        for entry in &result {
            assert!(entry.visual_offset_ms.unwrap() >= 0.0);
        }
        // Static 3 is the most-behind feed.
        assert_eq!(result[2].visual_offset_ms, Some(0.0));
    }

    #[test]
    fn permuting_inputs_preserves_per_feed_offsets() {
        let baseline = synchronize(
            &fixture_sources(),
            &fixture_timestamps(),
            &SyncOptions::default(),
        )
        .unwrap();

        let mut sources = fixture_sources();
        sources.reverse();
        let mut timestamps = fixture_timestamps();
        timestamps.swap(0, 2);
        let permuted = synchronize(&sources, &timestamps, &SyncOptions::default()).unwrap();

        for entry in &baseline {
            let other = permuted.iter().find(|e| e.name == entry.name).unwrap();
            assert_eq!(entry.offset_ms, other.offset_ms, "{}", entry.name);
            assert_eq!(entry.visual_offset_ms, other.visual_offset_ms);
        }
    }

    #[test]
    fn invalid_entries_pass_through_untouched() {
        let mut timestamps = fixture_timestamps();
        timestamps.push(FeedTimestamp::missing("Static 4"));
        let mut sources = fixture_sources();
        sources.push(source("Static 4", 100.0, 100.0, 55.0));

        let result = synchronize(&sources, &timestamps, &SyncOptions::default()).unwrap();
        let dead = &result[3];
        assert_eq!(dead.ms, -1.0);
        assert_eq!(dead.visual_offset_ms, None);
        assert_eq!(dead.offset_ms, None);
        // It still learns its capture latency.
        assert_eq!(dead.screenshot_delay_ms, 55.0);

        // And its source is not eligible as the least-delayed reference;
        // valid offsets match the three-feed run.
        assert_eq!(result[0].offset_ms, Some(2_355.392578125));
    }

    #[test]
    fn empty_valid_set_is_an_error() {
        let timestamps = vec![
            FeedTimestamp::missing("Static 1"),
            FeedTimestamp::new("Static 2", 0.0),
        ];
        let err = synchronize(&fixture_sources(), &timestamps, &SyncOptions::default())
            .unwrap_err();
        assert_eq!(err, SyncError::NoValidInput);
    }

    #[test]
    fn explicit_sync_target_pins_its_offset_to_zero() {
        let options = SyncOptions {
            sync_to: Some("Static 1"),
            ..Default::default()
        };
        let result =
            synchronize(&fixture_sources(), &fixture_timestamps(), &options).unwrap();
        assert_eq!(result[0].offset_ms, Some(0.0));
        // Everything else shifts by the anchor's pre-normalization offset.
        assert_eq!(
            result[1].offset_ms,
            Some(0.0 - 2_355.392578125)
        );
    }

    #[test]
    fn sync_target_without_timestamp_is_an_error_not_a_fallback() {
        let mut timestamps = fixture_timestamps();
        timestamps[0].ms = -1.0; // Static 1 failed to decode
        let options = SyncOptions {
            sync_to: Some("Static 1"),
            ..Default::default()
        };
        let err = synchronize(&fixture_sources(), &timestamps, &options).unwrap_err();
        assert_eq!(
            err,
            SyncError::AnchorNotFound {
                requested: Some("Static 1".to_string())
            }
        );
    }

    #[test]
    fn no_overlapping_source_is_an_error() {
        let sources = vec![source("Elsewhere", 0.0, 0.0, 0.0)];
        let timestamps = vec![FeedTimestamp::new("Static 1", 1_000.0)];
        let err = synchronize(&sources, &timestamps, &SyncOptions::default()).unwrap_err();
        assert_eq!(err, SyncError::NoDelayReference);
    }

    #[test]
    fn baseline_tie_resolves_to_first_listed_entry() {
        let sources = vec![
            source("A", 5.0, 5.0, 0.0),
            source("B", 5.0, 5.0, 0.0),
        ];
        let timestamps = vec![
            FeedTimestamp::new("A", 1_000.0),
            FeedTimestamp::new("B", 1_000.0),
        ];
        let result = synchronize(&sources, &timestamps, &SyncOptions::default()).unwrap();
        // Equal everywhere: both entries end at zero, via A as baseline
        // and anchor.
        assert_eq!(result[0].offset_ms, Some(0.0));
        assert_eq!(result[1].offset_ms, Some(0.0));
        assert_eq!(result[0].visual_offset_ms, Some(0.0));
        assert_eq!(result[1].visual_offset_ms, Some(0.0));
    }

    #[test]
    fn framerate_rounding_quantizes_final_offsets() {
        let options = SyncOptions {
            round_to_framerate: Some(60.0),
            ..Default::default()
        };
        let result =
            synchronize(&fixture_sources(), &fixture_timestamps(), &options).unwrap();
        let frame_ms = 1000.0 / 60.0;
        for entry in &result {
            let offset = entry.offset_ms.unwrap();
            let remainder = (offset / frame_ms) - (offset / frame_ms).round();
            assert!(remainder.abs() < 1e-9, "{offset} is not frame-aligned");
        }
        // The anchor stays at exactly zero.
        assert_eq!(result[1].offset_ms, Some(0.0));
    }

    #[test]
    fn missing_capture_latency_is_treated_as_zero() {
        let mut sources = fixture_sources();
        for s in &mut sources {
            s.screenshot_delay = None;
        }
        let result =
            synchronize(&sources, &fixture_timestamps(), &SyncOptions::default()).unwrap();
        assert_eq!(result[0].screenshot_delay_ms, 0.0);
        assert_eq!(result[0].ms, 1_684_006_697_435.87);
    }
}
