//! Error types for the image transformer.
//!
//! Uses thiserror for structured errors. The families map onto the ways a
//! request can fail:
//! - [`FilterError`]: the filter token in the path is not a known filter
//! - [`CodecError`]: the request body is not a usable image
//! - [`PipelineError`]: an internal invariant was broken (always a defect)
//! - [`ConfigError`]: the service could not be configured at startup
//!
//! [`ServiceError`] wraps them together with the routing and admission
//! outcomes and knows how each one is surfaced over HTTP.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier attached to every request for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Why a request did not match the service's routing grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    /// The path is not of the form `/process/<filter>/<x>,<y>,<w>,<h>`.
    NotFound,
    /// The path matches but the method is not POST.
    MethodNotAllowed,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::NotFound => write!(f, "not found"),
            MismatchReason::MethodNotAllowed => write!(f, "method not allowed"),
        }
    }
}

/// Top-level error type for a single request.
///
/// Every variant is local to the request that produced it.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Route mismatch: {0}")]
    RouteMismatch(MismatchReason),

    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    #[error("Invalid image: {0}")]
    InvalidImage(#[from] CodecError),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Admission rejected, retry after {retry_after:?}")]
    Overloaded { retry_after: Duration },

    #[error("Internal error: {0}")]
    Internal(#[from] PipelineError),
}

/// Errors from resolving a filter token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("Invalid level '{level}' for filter '{filter}', expected an integer in 0..=100")]
    InvalidLevel { filter: String, level: String },
}

/// Errors from the raster codec.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Body is not a decodable image: {0}")]
    Undecodable(String),

    #[error("Unsupported pixel format {0}, expected 8-bit RGBA")]
    UnsupportedPixelFormat(String),

    #[error("Image sides must not exceed {max} pixels")]
    TooLarge { max: u32 },

    #[error("Failed to encode result: {0}")]
    Encode(String),
}

/// Internal invariant violations inside the pixel pipeline.
///
/// These never come from user input; seeing one means a bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Pixel buffer holds {actual} pixels, expected {expected} for {width}x{height}")]
    PixelCountMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Region {0} lies outside the source image")]
    RegionOutOfBounds(String),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Errors raised while loading the service configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ServiceError {
    /// Whether this error is caused by the client rather than by the service.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Internal(_) => false,
            ServiceError::InvalidImage(err) => !err.is_internal(),
            _ => true,
        }
    }
}

impl CodecError {
    /// Encoding failures happen after validation and are our fault.
    pub fn is_internal(&self) -> bool {
        matches!(self, CodecError::Encode(_))
    }
}

/// Result type alias for filter resolution.
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type alias for pipeline internals.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for request handling.
pub type ServiceResult<T> = Result<T, ServiceError>;
