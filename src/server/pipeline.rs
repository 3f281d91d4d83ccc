//! The per-request processing pipeline.
//!
//! Resolves the filter, decodes the body, clips the requested rectangle,
//! filters the region and encodes the result. Everything here is synchronous
//! and CPU bound; the HTTP layer runs it on the blocking pool.

use crate::core::clip::{clip, Clip};
use crate::core::error::{RequestId, ServiceResult};
use crate::filters::processor::PixelProcessor;
use crate::filters::registry::FilterRegistry;
use crate::server::codec::ImageCodec;
use crate::server::router::Route;
use image::ImageFormat;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

/// Successful result of running the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The filtered region, encoded like the request body.
    Filtered {
        /// Encoded image bytes.
        body: Vec<u8>,
        /// Their format.
        format: ImageFormat,
    },
    /// The requested rectangle does not overlap the image.
    NoContent,
}

/// Shared, immutable pipeline used by every request.
#[derive(Clone)]
pub struct TransformPipeline {
    registry: Arc<FilterRegistry>,
    codec: Arc<dyn ImageCodec>,
    processor: PixelProcessor,
}

impl TransformPipeline {
    /// Create a pipeline.
    pub fn new(registry: Arc<FilterRegistry>, codec: Arc<dyn ImageCodec>, processor: PixelProcessor) -> Self {
        Self {
            registry,
            codec,
            processor,
        }
    }

    /// The filter registry.
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Run one request through the pipeline.
    pub fn run(&self, id: RequestId, route: &Route, body: &[u8]) -> ServiceResult<Outcome> {
        let filter = self.registry.resolve(&route.filter).map_err(|e| {
            info!("[{}] Incorrect filter: {}", id, e);
            e
        })?;

        let decoded = self.codec.decode(body).map_err(|e| {
            info!("[{}] Incorrect image: {}", id, e);
            e
        })?;
        let image = &decoded.image;

        let region = match clip(route.rect, image.width(), image.height()) {
            Clip::Region(region) => region,
            Clip::Empty => {
                debug!(
                    "[{}] Rectangle {} misses {}x{} image",
                    id,
                    route.rect,
                    image.width(),
                    image.height()
                );
                return Ok(Outcome::NoContent);
            }
        };

        debug!("[{}] Filter {} begin on {}", id, filter, region);
        let start = Instant::now();
        let filtered = self.processor.process_region(image, &region, filter)?;
        debug!("[{}] Filter end in {}us", id, start.elapsed().as_micros());

        let body = self.codec.encode(&filtered, decoded.format)?;
        Ok(Outcome::Filtered {
            body,
            format: decoded.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{CodecError, FilterError, ServiceError};
    use crate::core::types::Rect;
    use crate::filters::transform;
    use crate::core::color_table::ColorTable;
    use crate::server::codec::tests::png_bytes;
    use crate::server::codec::RasterCodec;

    fn pipeline() -> TransformPipeline {
        TransformPipeline::new(
            Arc::new(FilterRegistry::with_builtins()),
            Arc::new(RasterCodec::default()),
            PixelProcessor::global(),
        )
    }

    fn route(filter: &str, x: i32, y: i32, w: i32, h: i32) -> Route {
        Route {
            filter: filter.to_string(),
            rect: Rect::new(x, y, w, h),
        }
    }

    #[test]
    fn test_filters_clipped_region() {
        let pipeline = pipeline();
        let codec = RasterCodec::default();
        let source = codec.decode(&png_bytes(10, 10)).unwrap().image;

        let outcome = pipeline
            .run(RequestId::new(), &route("sepia", 8, -2, 5, 5), &png_bytes(10, 10))
            .unwrap();
        let Outcome::Filtered { body, format } = outcome else {
            panic!("expected filtered output");
        };
        assert_eq!(format, ImageFormat::Png);

        let out = codec.decode(&body).unwrap().image;
        assert_eq!((out.width(), out.height()), (2, 3));
        let expected = transform::sepia(ColorTable::global(), source.pixel(9, 2).unwrap());
        assert_eq!(out.pixel(1, 2), Some(expected));
    }

    #[test]
    fn test_full_image_when_rect_covers_it() {
        let outcome = pipeline()
            .run(RequestId::new(), &route("grayscale", -5, -5, 20, 20), &png_bytes(10, 10))
            .unwrap();
        let Outcome::Filtered { body, .. } = outcome else {
            panic!("expected filtered output");
        };
        let out = RasterCodec::default().decode(&body).unwrap().image;
        assert_eq!((out.width(), out.height()), (10, 10));
    }

    #[test]
    fn test_no_content_outside_image() {
        let outcome = pipeline()
            .run(RequestId::new(), &route("threshold(50)", 20, 20, 5, 5), &png_bytes(10, 10))
            .unwrap();
        assert_eq!(outcome, Outcome::NoContent);
    }

    #[test]
    fn test_invalid_filter_rejected_before_decode() {
        let result = pipeline().run(RequestId::new(), &route("blur", 0, 0, 1, 1), b"not an image");
        assert!(matches!(
            result,
            Err(ServiceError::InvalidFilter(FilterError::UnknownFilter(_)))
        ));
    }

    #[test]
    fn test_invalid_image_rejected() {
        let result = pipeline().run(RequestId::new(), &route("sepia", 0, 0, 1, 1), b"not an image");
        assert!(matches!(
            result,
            Err(ServiceError::InvalidImage(CodecError::Undecodable(_)))
        ));
    }
}
