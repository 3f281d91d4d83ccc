//! Core types for the image transformer.
//!
//! This module contains the foundational pieces of the pixel pipeline:
//! - Packed ARGB pixels, rectangles and images
//! - Rectangle clipping against image bounds
//! - Precomputed color lookup tables
//! - Error types

pub mod types;
pub mod clip;
pub mod color_table;
pub mod error;

// Re-export commonly used types
pub use types::{ArgbImage, ClippedRegion, Rect};
pub use clip::{clip, Clip};
pub use color_table::ColorTable;
pub use error::{CodecError, FilterError, PipelineError, ServiceError};
