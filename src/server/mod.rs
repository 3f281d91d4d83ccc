//! HTTP service.
//!
//! Wires the admission gate, the request router and the processing pipeline
//! into an axum application.

pub mod admission;
pub mod app;
pub mod codec;
pub mod config;
pub mod pipeline;
pub mod router;

pub use admission::{AdmissionGate, AdmissionOptions, Decision, EnforcementMode};
pub use app::{build_app, build_app_with_codec, serve, AppState};
pub use codec::{DecodedImage, ImageCodec, RasterCodec};
pub use config::ServiceConfig;
pub use pipeline::{Outcome, TransformPipeline};
pub use router::{RequestRouter, Route, RouteOutcome};
