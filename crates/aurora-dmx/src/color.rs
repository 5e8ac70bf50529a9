//! Level and color conversions

use palette::{FromColor, Hsv, Srgb};

/// Map a 0.0-1.0 level to a DMX byte. Out-of-range levels are clamped and
/// NaN is treated as dark.
pub fn normalized_to_byte(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// HSV (each 0.0-1.0, hue wraps) to normalized RGB
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (f32, f32, f32) {
    let hsv = Hsv::new(hue * 360.0, saturation.clamp(0.0, 1.0), value.clamp(0.0, 1.0));
    let rgb: Srgb = Srgb::from_color(hsv);
    (rgb.red, rgb.green, rgb.blue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bytes((r, g, b): (f32, f32, f32)) -> (u8, u8, u8) {
        (normalized_to_byte(r), normalized_to_byte(g), normalized_to_byte(b))
    }

    #[test]
    fn test_normalized_to_byte() {
        assert_eq!(normalized_to_byte(0.0), 0);
        assert_eq!(normalized_to_byte(1.0), 255);
        assert_eq!(normalized_to_byte(0.5), 128);
        assert_eq!(normalized_to_byte(1.5), 255);
        assert_eq!(normalized_to_byte(-0.1), 0);
        assert_eq!(normalized_to_byte(f32::NAN), 0);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(bytes(hsv_to_rgb(0.0, 1.0, 1.0)), (255, 0, 0));
        assert_eq!(bytes(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0)), (0, 255, 0));
        assert_eq!(bytes(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0)), (0, 0, 255));
        assert_eq!(bytes(hsv_to_rgb(0.25, 0.0, 1.0)), (255, 255, 255));
        assert_eq!(bytes(hsv_to_rgb(0.5, 1.0, 0.0)), (0, 0, 0));
    }

    proptest! {
        #[test]
        fn normalized_is_monotonic(a in -2.0f32..2.0, b in -2.0f32..2.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(normalized_to_byte(lo) <= normalized_to_byte(hi));
        }

        #[test]
        fn normalized_never_panics(v in any::<f32>()) {
            let _ = normalized_to_byte(v);
        }
    }
}
