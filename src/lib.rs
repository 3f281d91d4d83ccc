//! # Image Transformer - region filtering over HTTP
//!
//! A small service that takes an image and a rectangle and returns that part
//! of the image with a color filter applied. Alpha is always kept as is.
//!
//! ## Features
//!
//! - **Table-driven filters**: grayscale and sepia results for every RGB value
//!   are computed once at startup, so filtering is a lookup per pixel
//! - **Parallel pixel work**: regions are filtered across rayon threads
//! - **Typed routing**: a path either matches the grammar or it does not, and
//!   bad parameters are a separate outcome from unknown paths
//! - **Admission control**: a token bucket turns away excess traffic before
//!   any decoding happens
//!
//! ## Request Format
//!
//! ```text
//! POST /process/{grayscale|sepia|threshold(N)}/{x},{y},{w},{h}
//! ```
//!
//! `N` is an integer percentage in `0..=100`. The body is a PNG, BMP or TIFF
//! image with 8-bit RGBA pixels, at most 1000 pixels on each side. The
//! response holds the filtered region in the same format, or is empty with
//! status 204 when the rectangle misses the image.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use image_transformer::prelude::*;
//!
//! ColorTable::init();
//! let config = ServiceConfig::from_file("transformer.toml")?;
//! image_transformer::server::serve(config).await?;
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: pixels, rectangles, clipping, color tables and errors
//! - [`filters`]: filter registry, pixel transforms and the region processor
//! - [`server`]: admission gate, router, codec, pipeline and the axum app

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod filters;
pub mod server;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use image_transformer::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{ArgbImage, ClippedRegion, Rect};
    pub use crate::core::clip::{clip, Clip};
    pub use crate::core::color_table::ColorTable;

    // Errors
    pub use crate::core::error::{
        CodecError, ConfigError, FilterError, MismatchReason, PipelineError, RequestId,
        ServiceError,
    };

    // Filters
    pub use crate::filters::processor::PixelProcessor;
    pub use crate::filters::registry::{FilterMetadata, FilterRegistry};
    pub use crate::filters::transform::Filter;

    // Service
    pub use crate::server::admission::{AdmissionGate, AdmissionOptions, Decision, EnforcementMode};
    pub use crate::server::codec::{DecodedImage, ImageCodec, RasterCodec};
    pub use crate::server::config::ServiceConfig;
    pub use crate::server::pipeline::{Outcome, TransformPipeline};
    pub use crate::server::router::{RequestRouter, Route, RouteOutcome};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use axum::http::Method;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "image_transformer");
    }

    #[test]
    fn test_route_to_filter() {
        let router = RequestRouter::default();
        let registry = FilterRegistry::with_builtins();

        let RouteOutcome::Matched(route) = router.resolve(&Method::POST, "/process/threshold(50)/0,0,1,1") else {
            panic!("expected a match");
        };
        assert_eq!(registry.resolve(&route.filter), Ok(Filter::Threshold(50)));
    }

    #[test]
    fn test_clip_and_process() {
        let image = ArgbImage::from_pixels(2, 2, vec![0xFF10_2030, 0x8000_0000, 0x00FF_FFFF, 0x7F64_6464]).unwrap();
        let region = clip(Rect::new(1, 1, 5, 5), 2, 2).region().unwrap();

        let out = PixelProcessor::global()
            .process_region(&image, &region, Filter::Threshold(50))
            .unwrap();
        // intensity 100 is below 127
        assert_eq!(out.pixels(), &[0x7F00_0000]);
    }
}
