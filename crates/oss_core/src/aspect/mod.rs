//! Aspect-ratio cropping of scene items.
//!
//! Feeds delivered at 16:10 get letterboxed into a 16:9 program; cropping
//! the bottom strip (where the burned-in timestamp lives) restores a clean
//! 16:9 picture, and the reverse op uncrops them again.

use tracing::debug;

use crate::obs::{ObsClient, ObsError};

/// Greatest common divisor, for reducing a source's pixel dimensions to an
/// aspect ratio.
pub fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Reduce pixel dimensions to an aspect ratio, normalizing 8:5 to 16:10.
pub fn reduced_aspect(width: u32, height: u32) -> (u32, u32) {
    let divisor = gcd(width, height).max(1);
    match (width / divisor, height / divisor) {
        (8, 5) => (16, 10),
        reduced => reduced,
    }
}

/// Crop to apply to one scene item for a target ratio: the number of
/// pixels to cut from the bottom, or 0 to uncrop.
pub fn bottom_crop_for(source_width: u32, source_height: u32, target: (u32, u32)) -> u32 {
    let (_, ratio_height) = reduced_aspect(source_width, source_height);
    let new_height = source_height as f64 * target.1 as f64 / ratio_height as f64;
    if (source_height as f64) > new_height {
        (source_height as f64 - new_height).round() as u32
    } else {
        0
    }
}

/// One crop decision made by [`set_scene_crop`].
#[derive(Debug, Clone)]
pub struct CropChange {
    pub source_name: String,
    /// Pixels cut from the bottom; 0 means the item was reset.
    pub crop_bottom: u32,
}

/// Crop every sized item of the current scene to the target aspect ratio.
///
/// In studio mode the preview scene is edited, otherwise the program scene.
pub async fn set_scene_crop(
    client: &ObsClient,
    target: (u32, u32),
) -> Result<Vec<CropChange>, ObsError> {
    let scene = if client.get_studio_mode_enabled().await? {
        client.get_current_preview_scene().await?
    } else {
        client.get_current_program_scene().await?
    };

    let items = client.get_scene_item_list(&scene).await?;
    let mut changes = Vec::new();

    for item in items {
        let Some(transform) = &item.scene_item_transform else {
            continue;
        };
        let width = transform.source_width as u32;
        let height = transform.source_height as u32;
        if width == 0 || height == 0 {
            debug!("skipping {}, its size does not look valid", item.source_name);
            continue;
        }

        let crop_bottom = bottom_crop_for(width, height, target);
        client
            .set_scene_item_crop_bottom(&scene, item.scene_item_id, crop_bottom)
            .await?;
        changes.push(CropChange {
            source_name: item.source_name,
            crop_bottom,
        });
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_reduces_common_sizes() {
        assert_eq!(gcd(1920, 1080), 120);
        assert_eq!(gcd(1920, 1200), 240);
        assert_eq!(gcd(7, 0), 7);
    }

    #[test]
    fn reduced_aspect_normalizes_eight_by_five() {
        assert_eq!(reduced_aspect(1920, 1200), (16, 10));
        assert_eq!(reduced_aspect(1920, 1080), (16, 9));
    }

    #[test]
    fn sixteen_ten_source_cropped_to_sixteen_nine() {
        // 1920x1200 -> keep 1080 rows, cut 120 from the bottom.
        assert_eq!(bottom_crop_for(1920, 1200, (16, 9)), 120);
    }

    #[test]
    fn sixteen_nine_source_needs_no_crop() {
        assert_eq!(bottom_crop_for(1920, 1080, (16, 9)), 0);
    }

    #[test]
    fn restoring_sixteen_ten_resets_the_crop() {
        assert_eq!(bottom_crop_for(1920, 1200, (16, 10)), 0);
    }
}
