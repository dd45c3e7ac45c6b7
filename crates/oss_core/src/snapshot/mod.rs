//! Persist captured frames to a `screenshots/` folder.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::warn;

use crate::capture::CapturedFrame;
use crate::config::ImageSettings;
use crate::decode::{prepare_image, ImagePrepError};

/// Errors while saving one frame to disk.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error(transparent)]
    Prep(#[from] ImagePrepError),

    #[error("failed to write screenshot: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode screenshot: {0}")]
    Encode(#[from] image::ImageError),
}

/// Make a feed name safe for filenames: parentheses dropped, runs of other
/// non-word characters collapsed into a dash.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.trim().chars() {
        if ch == '(' || ch == ')' {
            continue;
        }
        if ch.is_alphanumeric() || ch == '_' || ch == '.' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Render the configured filename pattern for one feed at one instant.
///
/// An invalid chrono pattern falls back to the default format rather than
/// failing the save.
pub fn screenshot_filename(
    settings: &ImageSettings,
    name: &str,
    now: DateTime<Local>,
) -> String {
    let pattern = &settings.screenshot_filename_format;
    let valid = StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error));
    let pattern = if valid {
        pattern.clone()
    } else {
        warn!("invalid screenshot_filename_format {pattern:?}, using default");
        ImageSettings::default().screenshot_filename_format
    };
    now.format(&pattern)
        .to_string()
        .replace("{name}", &sanitize_name(name))
}

/// Save the cropped timestamp region and the full frame for every captured
/// feed, returning per-feed outcomes.
pub fn save_screenshots(
    frames: &[CapturedFrame],
    settings: &ImageSettings,
    directory: &Path,
    now: DateTime<Local>,
) -> Vec<(String, Result<PathBuf, SnapshotError>)> {
    frames
        .iter()
        .map(|frame| {
            let result = save_frame(frame, settings, directory, now);
            (frame.name.clone(), result)
        })
        .collect()
}

fn save_frame(
    frame: &CapturedFrame,
    settings: &ImageSettings,
    directory: &Path,
    now: DateTime<Local>,
) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(directory)?;
    let stem = screenshot_filename(settings, &frame.name, now);

    let cropped_path = directory.join(format!("{stem}.{}", settings.format));
    let cropped = prepare_image(&frame.image_data, settings, true)?;
    cropped.to_rgb8().save(&cropped_path)?;

    let full_path = directory.join(format!("{stem}_full.{}", settings.format));
    let full = prepare_image(&frame.image_data, settings, false)?;
    full.to_rgb8().save(&full_path)?;

    Ok(cropped_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sanitize_drops_parens_and_collapses_runs() {
        assert_eq!(sanitize_name("Static 1 (backup)"), "Static-1-backup");
        assert_eq!(sanitize_name("  spaced  out  "), "spaced-out");
        assert_eq!(sanitize_name("plain.name_ok"), "plain.name_ok");
    }

    #[test]
    fn filename_renders_date_and_name() {
        let settings = ImageSettings::default();
        let now = Local.with_ymd_and_hms(2023, 5, 13, 18, 58, 17).unwrap();
        let name = screenshot_filename(&settings, "Static 1", now);
        assert_eq!(name, "[Screenshot] 2023-05-13 18-58-17 [Static-1]");
    }

    #[test]
    fn invalid_pattern_falls_back_to_default() {
        let settings = ImageSettings {
            screenshot_filename_format: "%Q bogus".to_string(),
            ..ImageSettings::default()
        };
        let now = Local.with_ymd_and_hms(2023, 5, 13, 18, 58, 17).unwrap();
        let name = screenshot_filename(&settings, "Feed", now);
        assert!(name.starts_with("[Screenshot] 2023-05-13"));
    }
}
