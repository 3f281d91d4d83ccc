//! Core value types that flow through the filtering pipeline.
//!
//! Pixels are packed `u32` values in ARGB order (`A<<24 | R<<16 | G<<8 | B`),
//! which keeps the color lookup key (`pixel & RGB_MASK`) a single mask away.

use crate::core::error::{PipelineError, PipelineResult};
use image::RgbaImage;
use std::fmt;

/// Mask selecting the alpha byte of a packed pixel.
pub const ALPHA_MASK: u32 = 0xFF00_0000;

/// Mask selecting the red, green and blue bytes of a packed pixel.
pub const RGB_MASK: u32 = 0x00FF_FFFF;

/// Pack four channels into an ARGB pixel.
#[inline]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Split an ARGB pixel into `[a, r, g, b]`.
#[inline]
pub fn unpack_argb(pixel: u32) -> [u8; 4] {
    pixel.to_be_bytes()
}

/// A requested rectangle, as it appears in the request path.
///
/// The origin may be negative and the extent may run past the image or be
/// zero or negative; [`crate::core::clip::clip`] turns it into something usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width, possibly zero or negative.
    pub width: i32,
    /// Height, possibly zero or negative.
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// A non-empty region lying entirely inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedRegion {
    /// Left edge, inside the image.
    pub x: u32,
    /// Top edge, inside the image.
    pub y: u32,
    /// Width, at least 1.
    pub width: u32,
    /// Height, at least 1.
    pub height: u32,
}

impl ClippedRegion {
    /// Number of pixels covered by the region.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for ClippedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Immutable 8-bit ARGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgbImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl ArgbImage {
    /// Build an image from packed pixels, checking the buffer length.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> PipelineResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(PipelineError::PixelCountMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Convert a decoded RGBA buffer.
    pub fn from_rgba(rgba: &RgbaImage) -> Self {
        let pixels = rgba
            .pixels()
            .map(|p| pack_argb(p[3], p[0], p[1], p[2]))
            .collect();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            pixels,
        }
    }

    /// Convert back to an RGBA buffer for encoding.
    pub fn to_rgba(&self) -> RgbaImage {
        let mut raw = Vec::with_capacity(self.pixels.len() * 4);
        for &pixel in &self.pixels {
            let [a, r, g, b] = unpack_argb(pixel);
            raw.extend_from_slice(&[r, g, b, a]);
        }
        RgbaImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All pixels in row-major order.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, if inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Copy the pixels of `region` into a new row-major buffer.
    pub fn copy_region(&self, region: &ClippedRegion) -> PipelineResult<Vec<u32>> {
        let right = region.x as u64 + region.width as u64;
        let bottom = region.y as u64 + region.height as u64;
        if right > self.width as u64 || bottom > self.height as u64 {
            return Err(PipelineError::RegionOutOfBounds(region.to_string()));
        }

        let stride = self.width as usize;
        let mut out = Vec::with_capacity(region.pixel_count());
        for row in region.y as usize..bottom as usize {
            let start = row * stride + region.x as usize;
            out.extend_from_slice(&self.pixels[start..start + region.width as usize]);
        }
        Ok(out)
    }
}
