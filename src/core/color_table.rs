//! Precomputed color lookup tables.
//!
//! Every 24-bit RGB value is mapped to its grayscale and sepia result once,
//! so filtering a pixel is a single index into a table. The tables are
//! process-wide and read-only after construction.

use crate::core::types::RGB_MASK;
use log::info;
use rayon::prelude::*;
use std::sync::OnceLock;
use std::time::Instant;

/// Number of entries per table, one per 24-bit RGB value.
pub const TABLE_SIZE: usize = 1 << 24;

static GLOBAL: OnceLock<ColorTable> = OnceLock::new();

/// Grayscale and sepia lookup tables keyed by `r<<16 | g<<8 | b`.
///
/// Entries hold packed RGB with a zero alpha byte.
pub struct ColorTable {
    gray: Box<[u32]>,
    sepia: Box<[u32]>,
}

impl ColorTable {
    /// Build both tables. Takes a noticeable moment and 128 MiB of memory.
    pub fn build() -> Self {
        let gray = (0..TABLE_SIZE as u32)
            .into_par_iter()
            .map(gray_entry)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let sepia = (0..TABLE_SIZE as u32)
            .into_par_iter()
            .map(sepia_entry)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { gray, sepia }
    }

    /// Build the process-wide tables if that has not happened yet.
    ///
    /// Call once at startup so no request pays for the build.
    pub fn init() -> &'static ColorTable {
        GLOBAL.get_or_init(|| {
            let start = Instant::now();
            let table = ColorTable::build();
            info!(
                "Built color tables ({} entries each, {} MiB) in {}ms",
                TABLE_SIZE,
                table.memory_size() / (1024 * 1024),
                start.elapsed().as_millis()
            );
            table
        })
    }

    /// The process-wide tables, building them on first use.
    pub fn global() -> &'static ColorTable {
        Self::init()
    }

    /// Grayscale (channel average) value for the RGB part of `pixel`.
    #[inline]
    pub fn gray(&self, pixel: u32) -> u32 {
        self.gray[(pixel & RGB_MASK) as usize]
    }

    /// Sepia value for the RGB part of `pixel`.
    #[inline]
    pub fn sepia(&self, pixel: u32) -> u32 {
        self.sepia[(pixel & RGB_MASK) as usize]
    }

    /// Averaged intensity of `pixel`, read from the gray table's blue byte.
    #[inline]
    pub fn intensity(&self, pixel: u32) -> u8 {
        (self.gray(pixel) & 0xFF) as u8
    }

    /// Approximate heap size of both tables in bytes.
    pub fn memory_size(&self) -> usize {
        (self.gray.len() + self.sepia.len()) * std::mem::size_of::<u32>()
    }
}

#[inline]
fn split_rgb(key: u32) -> (u32, u32, u32) {
    ((key >> 16) & 0xFF, (key >> 8) & 0xFF, key & 0xFF)
}

fn gray_entry(key: u32) -> u32 {
    let (r, g, b) = split_rgb(key);
    let avg = (r + g + b) / 3;
    avg << 16 | avg << 8 | avg
}

fn sepia_entry(key: u32) -> u32 {
    let (r, g, b) = split_rgb(key);
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let weigh = |wr: f64, wg: f64, wb: f64| -> u32 { ((r * wr + g * wg + b * wb) as u32).min(255) };

    let red = weigh(0.393, 0.769, 0.189);
    let green = weigh(0.349, 0.686, 0.168);
    let blue = weigh(0.272, 0.534, 0.131);
    red << 16 | green << 8 | blue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{pack_argb, unpack_argb};

    #[test]
    fn test_gray_entry_truncates() {
        // (10 + 10 + 11) / 3 = 10.33
        assert_eq!(gray_entry(0x0A0A0B), 0x0A0A0A);
        assert_eq!(gray_entry(0xFFFFFF), 0xFFFFFF);
        assert_eq!(gray_entry(0x000000), 0x000000);
    }

    #[test]
    fn test_sepia_entry_reference_value() {
        let [_, r, g, b] = unpack_argb(sepia_entry(pack_argb(0, 200, 150, 100)));
        assert_eq!((r, g, b), (212, 189, 147));
    }

    #[test]
    fn test_sepia_entry_clamps() {
        let [a, r, g, b] = unpack_argb(sepia_entry(0xFFFFFF));
        assert_eq!(a, 0);
        // 0.272 + 0.534 + 0.131 = 0.937 of 255 is 238.935
        assert_eq!((r, g, b), (255, 255, 238));
    }

    #[test]
    fn test_global_table_lookups() {
        let table = ColorTable::global();
        let pixel = pack_argb(0x7F, 200, 150, 100);

        assert_eq!(table.gray(pixel), 0x969696);
        assert_eq!(table.sepia(pixel), pack_argb(0, 212, 189, 147));
        assert_eq!(table.intensity(pixel), 150);
        assert_eq!(table.memory_size(), 2 * TABLE_SIZE * 4);
    }

    #[test]
    fn test_global_is_built_once() {
        let first = ColorTable::global() as *const ColorTable;
        let second = ColorTable::init() as *const ColorTable;
        assert_eq!(first, second);
    }
}
