//! HTTP application.
//!
//! Layering, outermost first: concurrency limit, admission gate, dispatch.
//! Dispatch routes the request, reads the body and runs the
//! [`TransformPipeline`] on the blocking pool.

use crate::core::error::{MismatchReason, PipelineError, RequestId, ServiceError, ServiceResult};
use crate::filters::processor::PixelProcessor;
use crate::filters::registry::FilterRegistry;
use crate::server::admission::{admit, AdmissionGate};
use crate::server::codec::{ImageCodec, RasterCodec};
use crate::server::config::ServiceConfig;
use crate::server::pipeline::{Outcome, TransformPipeline};
use crate::server::router::{RequestRouter, RouteOutcome};
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{middleware, Router};
use log::{debug, error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task;
use tower::limit::ConcurrencyLimitLayer;

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    router: Arc<RequestRouter>,
    pipeline: TransformPipeline,
    max_body_bytes: usize,
}

impl AppState {
    /// Build the state from a configuration and a codec.
    pub fn new(config: &ServiceConfig, codec: Arc<dyn ImageCodec>) -> Self {
        let pipeline = TransformPipeline::new(
            Arc::new(FilterRegistry::with_builtins()),
            codec,
            PixelProcessor::global(),
        );
        Self {
            router: Arc::new(RequestRouter::new(config.route_prefix.clone())),
            pipeline,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// Build the application with the default raster codec.
pub fn build_app(config: &ServiceConfig) -> Router {
    let codec = Arc::new(RasterCodec::new(config.max_image_side));
    build_app_with_codec(config, codec)
}

/// Build the application around a specific codec.
pub fn build_app_with_codec(config: &ServiceConfig, codec: Arc<dyn ImageCodec>) -> Router {
    let state = AppState::new(config, codec);
    let gate = Arc::new(AdmissionGate::new(config.admission.clone()));

    Router::new()
        .route("/*path", any(dispatch))
        .fallback(dispatch)
        .with_state(state)
        .layer(middleware::from_fn_with_state(gate, admit))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrent_requests))
}

/// Bind the listen address and serve until the process exits.
pub async fn serve(config: ServiceConfig) -> std::io::Result<()> {
    let app = build_app(&config);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(
        "Listening on http://{} (POST /{}/<filter>/<x>,<y>,<w>,<h>, rayon_threads={})",
        listener.local_addr()?,
        config.route_prefix.trim_matches('/'),
        rayon::current_num_threads()
    );
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
}

async fn dispatch(State(state): State<AppState>, request: Request) -> ServiceResult<Response> {
    let id = RequestId::new();
    let (parts, body) = request.into_parts();

    let route = match state.router.resolve(&parts.method, parts.uri.path()) {
        RouteOutcome::Matched(route) => route,
        RouteOutcome::Mismatch(reason) => {
            debug!("[{}] {} {}: {}", id, parts.method, parts.uri.path(), reason);
            return Err(ServiceError::RouteMismatch(reason));
        }
    };

    let bytes = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|_| ServiceError::PayloadTooLarge {
            limit: state.max_body_bytes,
        })?;

    let pipeline = state.pipeline.clone();
    let result = match task::spawn_blocking(move || pipeline.run(id, &route, &bytes)).await {
        Ok(result) => result,
        Err(join) => Err(PipelineError::Worker(join.to_string()).into()),
    };
    let outcome = result.map_err(|e| {
        if !e.is_client_error() {
            error!("[{}] {}", id, e);
        }
        e
    })?;

    Ok(match outcome {
        Outcome::Filtered { body, format } => {
            let mut response = Response::new(Body::from(body));
            if let Ok(value) = HeaderValue::from_str(format.to_mime_type()) {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            response
        }
        Outcome::NoContent => StatusCode::NO_CONTENT.into_response(),
    })
}

impl ServiceError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::RouteMismatch(MismatchReason::NotFound) => StatusCode::NOT_FOUND,
            ServiceError::RouteMismatch(MismatchReason::MethodNotAllowed) => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidImage(e) if e.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            ServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Overloaded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let mut response = self.status().into_response();
        if let ServiceError::Overloaded { retry_after } = self {
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}
