//! Settings struct with TOML-based sections.
//!
//! Every section applies serde defaults per field, so a partial config file
//! (or one from an older version) still loads.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// OBS connection and scene discovery.
    #[serde(default)]
    pub obs: ObsSettings,

    /// Screenshot fetch and crop-rectangle configuration.
    #[serde(default)]
    pub image: ImageSettings,

    /// Synchronization behavior.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// OBS connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsSettings {
    /// WebSocket server URL.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// WebSocket server password; empty for a passwordless OBS instance.
    #[serde(default)]
    pub server_password: String,

    /// Scene whose items are treated as the feeds to synchronize.
    #[serde(default = "default_sources_scene")]
    pub sources_scene: String,

    /// Sort discovered feeds alphanumerically ("Feed 2" before "Feed 10").
    #[serde(default = "default_true")]
    pub natural_sort: bool,
}

fn default_server_url() -> String {
    "ws://127.0.0.1:4455".to_string()
}

fn default_sources_scene() -> String {
    "Stream Sources".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ObsSettings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            server_password: String::new(),
            sources_scene: default_sources_scene(),
            natural_sort: true,
        }
    }
}

/// How screenshots are fetched from OBS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// One request per feed, awaited in turn; records per-feed latency.
    #[default]
    Serial,
    /// One request batch executed between render frames.
    BatchRealtime,
    /// One request batch executed on the render thread, one per frame.
    BatchFrame,
}

/// Screenshot fetch and crop settings.
///
/// The crop rectangle picks the region carrying the burned-in QR code.
/// Each side resolves ratio-first: a `*_ratio` value scales against the
/// decoded frame dimensions, an absolute pixel value is used as-is, and the
/// built-in defaults cover the 16:10 bottom-strip layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Width requested from GetSourceScreenshot.
    #[serde(default = "default_fetch_width")]
    pub fetch_width: u32,

    /// Height requested from GetSourceScreenshot.
    #[serde(default = "default_fetch_height")]
    pub fetch_height: u32,

    /// Image format requested from OBS (`jpg`, `png`, ...).
    #[serde(default = "default_image_format")]
    pub format: String,

    /// Compression quality passed to OBS (0-100).
    #[serde(default = "default_compression_quality")]
    pub compression_quality: i64,

    /// Screenshot fetch strategy.
    #[serde(default)]
    pub capture_mode: CaptureMode,

    /// Crop rectangle, absolute pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_top: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_height: Option<u32>,

    /// Crop rectangle, as fractions of the frame dimensions. Takes
    /// precedence over the absolute values side-by-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_left_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_top_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_width_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_height_ratio: Option<f64>,

    /// Offer to persist captured frames to a `screenshots/` folder.
    #[serde(default)]
    pub save_screenshots: bool,

    /// chrono format string for screenshot filenames; `{name}` is replaced
    /// with a filesystem-safe feed name.
    #[serde(default = "default_screenshot_filename_format")]
    pub screenshot_filename_format: String,
}

fn default_fetch_width() -> u32 {
    384
}

fn default_fetch_height() -> u32 {
    240
}

fn default_image_format() -> String {
    "jpg".to_string()
}

fn default_compression_quality() -> i64 {
    100
}

fn default_screenshot_filename_format() -> String {
    "[Screenshot] %Y-%m-%d %H-%M-%S [{name}]".to_string()
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            fetch_width: default_fetch_width(),
            fetch_height: default_fetch_height(),
            format: default_image_format(),
            compression_quality: default_compression_quality(),
            capture_mode: CaptureMode::default(),
            rect_left: None,
            rect_top: None,
            rect_width: None,
            rect_height: None,
            rect_left_ratio: None,
            rect_top_ratio: None,
            rect_width_ratio: None,
            rect_height_ratio: None,
            save_screenshots: false,
            screenshot_filename_format: default_screenshot_filename_format(),
        }
    }
}

/// Synchronization behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Quantize final offsets to whole frame durations.
    #[serde(default = "default_true")]
    pub round_to_framerate: bool,

    /// Frame rate used for quantization, in Hz.
    #[serde(default = "default_framerate")]
    pub framerate: f64,
}

fn default_framerate() -> f64 {
    60.0
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            round_to_framerate: true,
            framerate: default_framerate(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Emit debug-level diagnostics (overridden by RUST_LOG).
    #[serde(default)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_yields_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.obs.server_url, "ws://127.0.0.1:4455");
        assert_eq!(settings.obs.sources_scene, "Stream Sources");
        assert_eq!(settings.image.fetch_width, 384);
        assert_eq!(settings.image.capture_mode, CaptureMode::Serial);
        assert!(settings.sync.round_to_framerate);
        assert_eq!(settings.sync.framerate, 60.0);
        assert!(!settings.logging.debug);
    }

    #[test]
    fn partial_section_keeps_other_fields() {
        let settings: Settings = toml::from_str(
            "[image]\ncapture_mode = \"batch-realtime\"\nrect_top_ratio = 0.9\n",
        )
        .unwrap();
        assert_eq!(settings.image.capture_mode, CaptureMode::BatchRealtime);
        assert_eq!(settings.image.rect_top_ratio, Some(0.9));
        assert_eq!(settings.image.fetch_height, 240);
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let mut settings = Settings::default();
        settings.obs.server_password = "hunter2".to_string();
        settings.image.rect_left = Some(12);
        let text = toml::to_string_pretty(&settings).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back.obs.server_password, "hunter2");
        assert_eq!(back.image.rect_left, Some(12));
    }
}
