//! Timestamp decoding from captured frames.
//!
//! The decoder itself sits behind [`TimestampDecoder`]; any failure along
//! the prepare/decode path degrades that feed to the `ms <= 0` sentinel and
//! never aborts the batch.

mod image_prep;

pub use image_prep::{prepare_image, resolve_rect, CropRect, ImagePrepError};

use image::GrayImage;
use tracing::{debug, warn};

use crate::capture::CapturedFrame;
use crate::config::ImageSettings;
use crate::models::FeedTimestamp;

/// Extracts a millisecond timestamp from a prepared (cropped, upscaled,
/// greyscale) frame region.
pub trait TimestampDecoder: Send + Sync {
    /// Returns the decoded timestamp, or `None` when no code was readable.
    fn decode(&self, image: &GrayImage) -> Option<f64>;
}

/// QR-code decoder: the timestamp source burns a QR whose payload is the
/// millisecond value in decimal.
#[derive(Debug, Default)]
pub struct QrTimestampDecoder;

impl TimestampDecoder for QrTimestampDecoder {
    fn decode(&self, image: &GrayImage) -> Option<f64> {
        let (width, height) = image.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| image.get_pixel(x as u32, y as u32).0[0],
        );
        for grid in prepared.detect_grids() {
            let content = match grid.decode() {
                Ok((_, content)) => content,
                Err(e) => {
                    debug!("QR grid failed to decode: {e}");
                    continue;
                }
            };
            match content.trim().parse::<f64>() {
                Ok(ms) if ms.is_finite() => return Some(ms),
                _ => debug!("QR payload is not a millisecond value: {content:?}"),
            }
        }
        None
    }
}

/// Run every captured frame through preparation and the decoder, producing
/// one [`FeedTimestamp`] per frame (sentinel on any failure).
pub fn decode_timestamps(
    frames: &[CapturedFrame],
    settings: &ImageSettings,
    decoder: &dyn TimestampDecoder,
) -> Vec<FeedTimestamp> {
    frames
        .iter()
        .map(|frame| {
            let decoded = match prepare_image(&frame.image_data, settings, true) {
                Ok(image) => decoder.decode(&image.to_luma8()),
                Err(e) => {
                    warn!("{} - could not prepare frame: {e}", frame.name);
                    None
                }
            };
            match decoded {
                Some(ms) => {
                    debug!("{} - decoded timestamp {ms}", frame.name);
                    FeedTimestamp::new(frame.name.clone(), ms)
                }
                None => {
                    warn!("{} - QR code not found", frame.name);
                    FeedTimestamp::missing(frame.name.clone())
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDecoder(Option<f64>);

    impl TimestampDecoder for FixedDecoder {
        fn decode(&self, _image: &GrayImage) -> Option<f64> {
            self.0
        }
    }

    fn frame_with_blank_png(name: &str) -> CapturedFrame {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let img = image::GrayImage::new(64, 64);
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        CapturedFrame {
            name: name.to_string(),
            image_data: format!("data:image/png;base64,{}", STANDARD.encode(&bytes)),
        }
    }

    #[test]
    fn decoded_value_becomes_a_valid_timestamp() {
        let frames = vec![frame_with_blank_png("Static 1")];
        let decoder = FixedDecoder(Some(1_684_006_697_435.87));
        let timestamps = decode_timestamps(&frames, &ImageSettings::default(), &decoder);
        assert_eq!(timestamps.len(), 1);
        assert!(timestamps[0].is_valid());
        assert_eq!(timestamps[0].ms, 1_684_006_697_435.87);
    }

    #[test]
    fn decode_failure_becomes_the_sentinel() {
        let frames = vec![frame_with_blank_png("Static 1")];
        let decoder = FixedDecoder(None);
        let timestamps = decode_timestamps(&frames, &ImageSettings::default(), &decoder);
        assert_eq!(timestamps[0].ms, -1.0);
        assert!(!timestamps[0].is_valid());
    }

    #[test]
    fn unreadable_payload_becomes_the_sentinel() {
        let frames = vec![CapturedFrame {
            name: "Static 1".to_string(),
            image_data: "not an image".to_string(),
        }];
        let decoder = FixedDecoder(Some(1.0));
        let timestamps = decode_timestamps(&frames, &ImageSettings::default(), &decoder);
        assert_eq!(timestamps[0].ms, -1.0);
    }

    #[test]
    fn qr_decoder_finds_nothing_in_a_blank_frame() {
        let image = GrayImage::new(64, 64);
        assert_eq!(QrTimestampDecoder.decode(&image), None);
    }
}
