//! Filter module.
//!
//! Contains the filter registry, the pixel transforms and the processor that
//! runs them over an image region.

pub mod registry;
pub mod transform;
pub mod processor;

pub use registry::{FilterRegistry, FilterMetadata};
pub use transform::Filter;
pub use processor::PixelProcessor;
