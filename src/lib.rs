pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{http::StatusCode, routing::any, Router};
use std::time::Duration;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub use config::{AppConfig, TransformConfig};
pub use domain::Transformer;
pub use error::{ConfigError, TransformError};
pub use middleware::RequestTransformLayer;

/// Build the demo server: every path reaches the echo upstream through the
/// request transform layer.
pub fn create_router(config: &AppConfig) -> Result<Router, ConfigError> {
    let transform = RequestTransformLayer::new(config.transform.clone())?;

    let router = Router::new()
        .route("/", any(handlers::echo::echo))
        .route("/{*path}", any(handlers::echo::echo))
        // Layers run bottom-up: trace, timeout, size limit, then transform
        .layer(transform)
        .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_millis(config.server.timeout_ms),
        ))
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
