//! Data models for obs-stream-sync.
//!
//! These are the value types exchanged between the capture, decode, sync,
//! and apply stages. They are rebuilt from the mixer's current state on
//! every sync run and never persisted.

use serde::{Deserialize, Serialize};

/// Current delay state of one feed, as reported by OBS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    /// Unique feed identifier (the OBS source name).
    pub name: String,
    /// Whether the feed is currently visible in OBS.
    pub active: bool,
    /// Audio sync offset already applied by OBS, in milliseconds.
    pub audio_delay: f64,
    /// Delay already applied by the async video-delay filter, in milliseconds.
    pub video_delay: f64,
    /// Wall-clock time spent capturing this feed's screenshot, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_delay: Option<f64>,
    /// Name of the feed's existing video-delay filter, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_filter_name: Option<String>,
}

impl SourceState {
    /// Create a source state with no delays and no capture latency recorded.
    pub fn new(name: impl Into<String>, audio_delay: f64, video_delay: f64) -> Self {
        Self {
            name: name.into(),
            active: false,
            audio_delay,
            video_delay,
            screenshot_delay: None,
            video_filter_name: None,
        }
    }
}

/// A timestamp decoded from one feed's captured frame.
///
/// A non-positive `ms` is the sentinel for "no usable timestamp" (decode
/// failure or capture not attempted) and excludes the entry from the
/// synchronization math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedTimestamp {
    /// Feed identifier; must match a [`SourceState::name`] to participate.
    pub name: String,
    /// Decoded timestamp in milliseconds.
    pub ms: f64,
}

impl FeedTimestamp {
    pub fn new(name: impl Into<String>, ms: f64) -> Self {
        Self {
            name: name.into(),
            ms,
        }
    }

    /// Sentinel entry for a feed whose frame yielded no timestamp.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::new(name, -1.0)
    }

    /// Whether this entry carries a usable timestamp.
    pub fn is_valid(&self) -> bool {
        self.ms > 0.0
    }
}

/// Engine output for one feed: the compensated timestamp plus the computed
/// offsets. Entries for feeds without a usable timestamp keep their input
/// `ms` and carry no offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedTimestamp {
    pub name: String,
    /// Timestamp in milliseconds, reduced by the capture latency for valid
    /// entries.
    pub ms: f64,
    /// How much later this feed appears relative to the most-behind feed.
    pub visual_offset_ms: Option<f64>,
    /// Corrective delay relative to the anchor feed.
    pub offset_ms: Option<f64>,
    /// Capture latency attached from the matching source (0 when unknown).
    pub screenshot_delay_ms: f64,
}

impl SyncedTimestamp {
    /// Whether this entry participated in the synchronization math.
    pub fn is_valid(&self) -> bool {
        self.offset_ms.is_some()
    }
}
