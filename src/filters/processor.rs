//! Applies a filter across a region of pixels.
//!
//! Each pixel is transformed independently, so rows are handed to rayon in
//! chunks. The filter variant is matched once per call, never per pixel.

use crate::core::color_table::ColorTable;
use crate::core::error::PipelineResult;
use crate::core::types::{ArgbImage, ClippedRegion};
use crate::filters::transform::{self, Filter};
use rayon::prelude::*;

/// Pixels handed to one rayon task.
const CHUNK_PIXELS: usize = 4096;

/// Runs filters over pixel buffers using a shared [`ColorTable`].
#[derive(Clone, Copy)]
pub struct PixelProcessor {
    table: &'static ColorTable,
}

impl PixelProcessor {
    /// Create a processor backed by the given tables.
    pub fn new(table: &'static ColorTable) -> Self {
        Self { table }
    }

    /// Create a processor backed by the process-wide tables.
    pub fn global() -> Self {
        Self::new(ColorTable::global())
    }

    /// Filter `pixels` in place.
    pub fn apply(&self, filter: Filter, pixels: &mut [u32]) {
        let table = self.table;
        match filter {
            Filter::Grayscale => for_each_pixel(pixels, |p| transform::grayscale(table, p)),
            Filter::Sepia => for_each_pixel(pixels, |p| transform::sepia(table, p)),
            Filter::Threshold(_) => {
                let level = filter.byte_level();
                for_each_pixel(pixels, |p| transform::threshold(table, p, level))
            }
        }
    }

    /// Crop `region` out of `image`, filter it and return it as a new image.
    pub fn process_region(
        &self,
        image: &ArgbImage,
        region: &ClippedRegion,
        filter: Filter,
    ) -> PipelineResult<ArgbImage> {
        let mut pixels = image.copy_region(region)?;
        self.apply(filter, &mut pixels);
        ArgbImage::from_pixels(region.width, region.height, pixels)
    }
}

fn for_each_pixel<F>(pixels: &mut [u32], op: F)
where
    F: Fn(u32) -> u32 + Sync,
{
    pixels.par_chunks_mut(CHUNK_PIXELS).for_each(|chunk| {
        for pixel in chunk {
            *pixel = op(*pixel);
        }
    });
}
