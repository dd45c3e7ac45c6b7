//! Prepare a captured frame for QR detection: base64 decode, crop to the
//! configured timestamp region, and upscale tiny crops.

use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;
use tracing::warn;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::ImageSettings;

/// QR detection needs at least this many pixels on each side; smaller crops
/// are upscaled with nearest-neighbour so the module edges stay sharp.
const MIN_DECODE_DIMENSION: u32 = 32;

/// Errors while turning an OBS screenshot payload into an image.
#[derive(Error, Debug)]
pub enum ImagePrepError {
    #[error("empty image payload")]
    Empty,

    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Resolved crop rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Resolve the configured crop rectangle against a frame of the given size.
///
/// Each side resolves ratio-first, then absolute pixels, then the built-in
/// default (the bottom strip where the 16:10 layout burns its code). The
/// result is clamped so the rectangle always fits inside the frame.
pub fn resolve_rect(settings: &ImageSettings, frame_width: u32, frame_height: u32) -> CropRect {
    let side = |ratio: Option<f64>, absolute: Option<u32>, extent: u32, default_ratio: f64| {
        match (ratio, absolute) {
            (Some(r), _) => (extent as f64 * r).round() as i64,
            (None, Some(px)) => px as i64,
            (None, None) => (extent as f64 * default_ratio).round() as i64,
        }
    };

    let left = side(settings.rect_left_ratio, settings.rect_left, frame_width, 0.0);
    let top = side(
        settings.rect_top_ratio,
        settings.rect_top,
        frame_height,
        9.0 / 10.0,
    );
    let width = side(
        settings.rect_width_ratio,
        settings.rect_width,
        frame_width,
        1.0 / 16.0,
    );
    let height = side(
        settings.rect_height_ratio,
        settings.rect_height,
        frame_height,
        1.0 / 10.0,
    );

    let left = left.clamp(0, frame_width.saturating_sub(1) as i64) as u32;
    let top = top.clamp(0, frame_height.saturating_sub(1) as i64) as u32;
    let width = width.clamp(1, (frame_width - left) as i64) as u32;
    let height = height.clamp(1, (frame_height - top) as i64) as u32;

    CropRect {
        left,
        top,
        width,
        height,
    }
}

/// Decode a base64 screenshot payload and, when `crop` is set, cut out the
/// timestamp region and upscale it for reliable QR detection.
pub fn prepare_image(
    image_data: &str,
    settings: &ImageSettings,
    crop: bool,
) -> Result<DynamicImage, ImagePrepError> {
    if image_data.is_empty() {
        return Err(ImagePrepError::Empty);
    }

    // OBS hands back a data URL; the decoder only wants the payload.
    let payload = match image_data.find(";base64,") {
        Some(index) => &image_data[index + ";base64,".len()..],
        None => image_data,
    };
    let bytes = STANDARD.decode(payload)?;
    let mut result = image::load_from_memory(&bytes)?;

    if result.width() <= 1 || result.height() <= 1 {
        warn!("screenshot is degenerate ({}x{}), QR reading will fail", result.width(), result.height());
        return Ok(result);
    }

    if crop {
        let rect = resolve_rect(settings, result.width(), result.height());
        result = result.crop_imm(rect.left, rect.top, rect.width, rect.height);
    }

    let width_multiplier = MIN_DECODE_DIMENSION.div_ceil(result.width());
    let height_multiplier = MIN_DECODE_DIMENSION.div_ceil(result.height());
    if width_multiplier > 1 || height_multiplier > 1 {
        result = result.resize_exact(
            result.width() * width_multiplier,
            result.height() * height_multiplier,
            FilterType::Nearest,
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageSettings;

    #[test]
    fn default_rect_targets_bottom_strip() {
        let settings = ImageSettings::default();
        let rect = resolve_rect(&settings, 384, 240);
        assert_eq!(rect, CropRect { left: 0, top: 216, width: 24, height: 24 });
    }

    #[test]
    fn ratio_takes_precedence_over_absolute() {
        let settings = ImageSettings {
            rect_left: Some(100),
            rect_left_ratio: Some(0.5),
            ..ImageSettings::default()
        };
        let rect = resolve_rect(&settings, 300, 100);
        assert_eq!(rect.left, 150);
    }

    #[test]
    fn absolute_values_used_when_no_ratio() {
        let settings = ImageSettings {
            rect_left: Some(10),
            rect_top: Some(20),
            rect_width: Some(30),
            rect_height: Some(40),
            ..ImageSettings::default()
        };
        let rect = resolve_rect(&settings, 384, 240);
        assert_eq!(
            rect,
            CropRect {
                left: 10,
                top: 20,
                width: 30,
                height: 40
            }
        );
    }

    #[test]
    fn rect_is_clamped_into_the_frame() {
        let settings = ImageSettings {
            rect_left: Some(500),
            rect_width: Some(900),
            ..ImageSettings::default()
        };
        let rect = resolve_rect(&settings, 384, 240);
        assert!(rect.left < 384);
        assert!(rect.left + rect.width <= 384);
    }

    #[test]
    fn prepare_upscales_small_crops() {
        // 8x8 checkerboard PNG, well under the 32px decode floor.
        let mut img = image::GrayImage::new(8, 8);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            pixel.0[0] = if (x + y) % 2 == 0 { 0 } else { 255 };
        }
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let payload = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );

        let settings = ImageSettings {
            rect_left: Some(0),
            rect_top: Some(0),
            rect_width: Some(8),
            rect_height: Some(8),
            ..ImageSettings::default()
        };
        let prepared = prepare_image(&payload, &settings, true).unwrap();
        assert!(prepared.width() >= MIN_DECODE_DIMENSION);
        assert!(prepared.height() >= MIN_DECODE_DIMENSION);
    }

    #[test]
    fn garbage_payload_is_an_error() {
        let settings = ImageSettings::default();
        assert!(prepare_image("", &settings, true).is_err());
        assert!(prepare_image("data:image/png;base64,!!!", &settings, true).is_err());
    }
}
