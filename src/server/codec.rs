//! Raster codec seam.
//!
//! The pipeline only needs "bytes to ARGB pixels" and back. [`ImageCodec`]
//! captures that, and [`RasterCodec`] implements it with the `image` crate.

use crate::core::error::{CodecError, CodecResult};
use crate::core::types::ArgbImage;
use image::{ColorType, DynamicImage, ImageFormat, ImageReader, Limits};
use std::io::Cursor;

/// Default bound on each side of an accepted image.
pub const DEFAULT_MAX_SIDE: u32 = 1000;

/// A decoded request image and the format it arrived in.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// The pixels.
    pub image: ArgbImage,
    /// Encoding of the request body; the response uses the same one.
    pub format: ImageFormat,
}

/// Decoding and encoding of request and response bodies.
pub trait ImageCodec: Send + Sync {
    /// Decode a request body into ARGB pixels.
    fn decode(&self, bytes: &[u8]) -> CodecResult<DecodedImage>;

    /// Encode an image in the given format.
    fn encode(&self, image: &ArgbImage, format: ImageFormat) -> CodecResult<Vec<u8>>;
}

/// Codec backed by the `image` crate.
///
/// Accepts PNG, BMP and TIFF images that decode to 8-bit RGBA and whose
/// sides do not exceed `max_side`.
#[derive(Debug, Clone)]
pub struct RasterCodec {
    max_side: u32,
}

impl RasterCodec {
    /// Create a codec accepting images up to `max_side` pixels wide and tall.
    pub fn new(max_side: u32) -> Self {
        Self { max_side }
    }

    /// The side limit.
    pub fn max_side(&self) -> u32 {
        self.max_side
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_side);
        limits.max_image_height = Some(self.max_side);
        limits
    }
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIDE)
    }
}

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> CodecResult<DecodedImage> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError::Undecodable(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| CodecError::Undecodable("unrecognized format".to_string()))?;
        reader.limits(self.limits());

        let decoded = reader.decode().map_err(|e| match e {
            image::ImageError::Limits(_) => CodecError::TooLarge { max: self.max_side },
            other => CodecError::Undecodable(other.to_string()),
        })?;

        // Not every decoder honours `Limits`.
        if decoded.width() > self.max_side || decoded.height() > self.max_side {
            return Err(CodecError::TooLarge { max: self.max_side });
        }

        match decoded {
            DynamicImage::ImageRgba8(rgba) => Ok(DecodedImage {
                image: ArgbImage::from_rgba(&rgba),
                format,
            }),
            other => Err(CodecError::UnsupportedPixelFormat(color_name(other.color()))),
        }
    }

    fn encode(&self, image: &ArgbImage, format: ImageFormat) -> CodecResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image.to_rgba())
            .write_to(&mut out, format)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

fn color_name(color: ColorType) -> String {
    format!("{:?}", color)
}
