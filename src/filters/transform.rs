//! The closed set of pixel transforms.

use crate::core::color_table::ColorTable;
use crate::core::types::{ALPHA_MASK, RGB_MASK};
use std::fmt;

/// Output RGB of a thresholded pixel at or above the level.
const WHITE: u32 = 0x00FF_FFFF;

/// Output RGB of a thresholded pixel below the level.
const BLACK: u32 = 0x0000_0000;

/// A resolved filter, ready to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Replace each channel with the average of the three.
    Grayscale,
    /// Classic sepia tone.
    Sepia,
    /// Black or white depending on intensity; the value is a percentage in `0..=100`.
    Threshold(u8),
}

impl Filter {
    /// Registry id of this filter.
    pub fn id(&self) -> &'static str {
        match self {
            Filter::Grayscale => "grayscale",
            Filter::Sepia => "sepia",
            Filter::Threshold(_) => "threshold",
        }
    }

    /// The threshold percentage scaled to `0..=255` (rounded down).
    ///
    /// Zero for filters that take no level.
    pub fn byte_level(&self) -> u8 {
        match self {
            Filter::Threshold(percent) => (255 * (*percent).min(100) as u32 / 100) as u8,
            Filter::Grayscale | Filter::Sepia => 0,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Threshold(percent) => write!(f, "threshold({})", percent),
            other => write!(f, "{}", other.id()),
        }
    }
}

/// Grayscale a single pixel, keeping its alpha.
#[inline]
pub fn grayscale(table: &ColorTable, pixel: u32) -> u32 {
    (table.gray(pixel) & RGB_MASK) | (pixel & ALPHA_MASK)
}

/// Sepia-tone a single pixel, keeping its alpha.
#[inline]
pub fn sepia(table: &ColorTable, pixel: u32) -> u32 {
    (table.sepia(pixel) & RGB_MASK) | (pixel & ALPHA_MASK)
}

/// Threshold a single pixel against a byte level, keeping its alpha.
///
/// Intensity equal to the level maps to white.
#[inline]
pub fn threshold(table: &ColorTable, pixel: u32, level: u8) -> u32 {
    let rgb = if table.intensity(pixel) < level { BLACK } else { WHITE };
    rgb | (pixel & ALPHA_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{pack_argb, unpack_argb};
    use proptest::prelude::*;

    #[test]
    fn test_byte_level() {
        assert_eq!(Filter::Threshold(0).byte_level(), 0);
        assert_eq!(Filter::Threshold(50).byte_level(), 127);
        assert_eq!(Filter::Threshold(100).byte_level(), 255);
        assert_eq!(Filter::Grayscale.byte_level(), 0);
        assert_eq!(Filter::Sepia.byte_level(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Filter::Grayscale.to_string(), "grayscale");
        assert_eq!(Filter::Threshold(42).to_string(), "threshold(42)");
    }

    #[test]
    fn test_sepia_reference_pixel() {
        let table = ColorTable::global();
        let out = sepia(table, pack_argb(0x33, 200, 150, 100));
        assert_eq!(unpack_argb(out), [0x33, 212, 189, 147]);
    }

    #[test]
    fn test_threshold_boundary() {
        let table = ColorTable::global();
        let level = Filter::Threshold(50).byte_level();

        // intensity 100 < 127
        assert_eq!(threshold(table, pack_argb(0xFF, 100, 100, 100), level), 0xFF00_0000);
        // intensity 127 == 127
        assert_eq!(threshold(table, pack_argb(0xFF, 127, 127, 127), level), 0xFFFF_FFFF);
        // (127 + 127 + 128) / 3 = 127
        assert_eq!(threshold(table, pack_argb(0x10, 127, 128, 127), level), 0x10FF_FFFF);
    }

    #[test]
    fn test_threshold_extremes() {
        let table = ColorTable::global();
        // level 0: everything is white
        assert_eq!(threshold(table, pack_argb(0, 0, 0, 0), 0), WHITE);
        // level 255: only pure white stays white
        assert_eq!(threshold(table, pack_argb(0, 255, 255, 254), 255), BLACK);
        assert_eq!(threshold(table, pack_argb(0, 255, 255, 255), 255), WHITE);
    }

    proptest! {
        #[test]
        fn prop_alpha_is_preserved(pixel in any::<u32>(), level in any::<u8>()) {
            let table = ColorTable::global();
            prop_assert_eq!(grayscale(table, pixel) & ALPHA_MASK, pixel & ALPHA_MASK);
            prop_assert_eq!(sepia(table, pixel) & ALPHA_MASK, pixel & ALPHA_MASK);
            prop_assert_eq!(threshold(table, pixel, level) & ALPHA_MASK, pixel & ALPHA_MASK);
        }

        #[test]
        fn prop_grayscale_is_achromatic(pixel in any::<u32>()) {
            let [_, r, g, b] = unpack_argb(grayscale(ColorTable::global(), pixel));
            prop_assert_eq!(r, g);
            prop_assert_eq!(g, b);
        }

        #[test]
        fn prop_threshold_is_binary(pixel in any::<u32>(), level in any::<u8>()) {
            let rgb = threshold(ColorTable::global(), pixel, level) & RGB_MASK;
            prop_assert!(rgb == BLACK || rgb == WHITE);
        }

        #[test]
        fn prop_sepia_matches_weights(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let [_, sr, sg, sb] = unpack_argb(sepia(ColorTable::global(), pack_argb(0, r, g, b)));
            let (r, g, b) = (r as f64, g as f64, b as f64);
            let expect = |v: f64| (v as u32).min(255) as u8;
            prop_assert_eq!(sr, expect(r * 0.393 + g * 0.769 + b * 0.189));
            prop_assert_eq!(sg, expect(r * 0.349 + g * 0.686 + b * 0.168));
            prop_assert_eq!(sb, expect(r * 0.272 + g * 0.534 + b * 0.131));
        }
    }
}
