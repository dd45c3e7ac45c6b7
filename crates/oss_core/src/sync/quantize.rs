//! Frame-duration quantization of delay offsets.

/// Round `ms` to the nearest multiple of one frame's duration at
/// `frame_rate` Hz.
///
/// When the quantized value rounds to the same whole millisecond as the
/// input, the input is returned unchanged: quantization that only produced
/// floating-point noise (`1000` becoming `1000.0000000000001`) must not
/// perturb the offset.
///
/// `frame_rate` must be positive; the result never diverges from the input
/// by more than half a frame duration.
pub fn quantize(ms: f64, frame_rate: f64) -> f64 {
    // 1000 ms / 60 fps = 16.67 ms per frame
    let frame_ms = 1000.0 / frame_rate;
    let quantized = (ms / frame_ms).round() * frame_ms;
    if quantized.round() == ms.round() {
        ms
    } else {
        quantized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_frame_multiple() {
        // 30 / 16.67 = 1.8 -> 2 frames -> 33.33
        let result = quantize(30.0, 60.0);
        assert!((result - 2.0 * (1000.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn float_noise_keeps_the_original_value() {
        // 1000 is exactly 60 frames at 16.67ms, but the multiplication
        // reintroduces noise; the guard hands back the clean input.
        assert_eq!(quantize(1000.0, 60.0), 1000.0);
        assert_eq!(quantize(0.0, 60.0), 0.0);
    }

    #[test]
    fn idempotent_under_millisecond_rounding() {
        for &input in &[30.0, 325.596923828125, 2355.392578125, -120.5] {
            let once = quantize(input, 60.0);
            let twice = quantize(once, 60.0);
            assert!((twice - once).abs() < 1.0, "{input}: {once} vs {twice}");
        }
    }

    #[test]
    fn never_diverges_more_than_half_a_frame() {
        let frame_ms = 1000.0 / 24.0;
        for &input in &[0.3, 12.9, 499.99, 1234.5678, -77.7] {
            let result = quantize(input, 24.0);
            assert!(
                (result - input).abs() <= frame_ms / 2.0 + 1e-9,
                "{input} -> {result}"
            );
        }
    }
}
