// Request transform middleware
//
// `RequestTransformLayer` wraps the next service in the chain. Pipeline mode
// rewrites the request body and calls it; template mode answers directly.

mod body;

pub use body::{read_body_lenient, ReadErrorHook};

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::Request,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    BoxError,
};
use serde_json::Value;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, info, warn};

use crate::config::{TransformConfig, TransformMode};
use crate::domain::{Cancellation, Transformed, Transformer};
use crate::error::{ConfigError, TransformError};

/// Layer that builds [`RequestTransform`] services sharing one transformer.
#[derive(Clone)]
pub struct RequestTransformLayer {
    transformer: Arc<Transformer>,
    name: Arc<str>,
    on_read_error: Option<ReadErrorHook>,
}

impl RequestTransformLayer {
    /// Validate `config` and build the transformer. Fails without side
    /// effects if the configuration is unusable.
    pub fn new(config: TransformConfig) -> Result<Self, ConfigError> {
        let name: Arc<str> = Arc::from(config.label());
        let transformer = Transformer::new(TransformMode::try_from(config)?)?;

        info!(
            name = %name,
            mode = transformer.mode_name(),
            "Request transform initialized"
        );

        Ok(Self {
            transformer: Arc::new(transformer),
            name,
            on_read_error: None,
        })
    }

    /// Create from a YAML transform configuration string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: TransformConfig = serde_yaml::from_str(yaml)?;
        Self::new(config)
    }

    /// Create from a JSON transform configuration string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TransformConfig = serde_json::from_str(json)?;
        Self::new(config)
    }

    /// Observe request body read errors. They never fail the request.
    pub fn on_read_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&axum::Error) + Send + Sync + 'static,
    {
        self.on_read_error = Some(Arc::new(hook));
        self
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }
}

impl<S> Layer<S> for RequestTransformLayer {
    type Service = RequestTransform<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTransform {
            inner,
            transformer: self.transformer.clone(),
            name: self.name.clone(),
            on_read_error: self.on_read_error.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequestTransform<S> {
    inner: S,
    transformer: Arc<Transformer>,
    name: Arc<str>,
    on_read_error: Option<ReadErrorHook>,
}

impl<S, B> Service<Request<B>> for RequestTransform<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        // Keep the service that was polled ready, leave a clone in its place
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(transform_request(
            inner,
            self.transformer.clone(),
            self.name.clone(),
            self.on_read_error.clone(),
            req.map(Body::new),
        ))
    }
}

async fn transform_request<S>(
    mut inner: S,
    transformer: Arc<Transformer>,
    name: Arc<str>,
    on_read_error: Option<ReadErrorHook>,
    req: Request,
) -> Result<Response, S::Error>
where
    S: Service<Request, Response = Response>,
{
    let (mut parts, body) = req.into_parts();
    let bytes = read_body_lenient(body, on_read_error.as_ref()).await;

    if bytes.is_empty() {
        debug!(name = %name, "Empty request body, forwarding unchanged");
        return inner.call(Request::from_parts(parts, Body::empty())).await;
    }

    let input = match transformer.decode(&bytes) {
        Ok(input) => input,
        Err(err) => return Ok(reject(&name, err)),
    };

    match run_transform(transformer, input).await {
        Err(err) => Ok(reject(&name, err)),
        Ok(Transformed::Rendered(text)) => {
            debug!(name = %name, bytes = text.len(), "Template rendered");
            Ok(([(header::CONTENT_TYPE, "application/json")], text).into_response())
        }
        Ok(Transformed::Json(body)) => {
            debug!(name = %name, bytes = body.len(), "Request body transformed");
            parts.headers.remove(header::TRANSFER_ENCODING);
            parts
                .headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
            inner.call(Request::from_parts(parts, Body::from(body))).await
        }
    }
}

/// Run the transformation on the blocking pool. Dropping the returned future
/// raises the cancellation flag so a pipeline stops at its next step.
async fn run_transform(
    transformer: Arc<Transformer>,
    input: Value,
) -> Result<Transformed, TransformError> {
    let cancel = Cancellation::new();
    let _guard = CancelOnDrop(cancel.clone());

    tokio::task::spawn_blocking(move || transformer.apply(input, &cancel))
        .await
        .map_err(|e| TransformError::Internal(e.to_string()))?
}

struct CancelOnDrop(Cancellation);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn reject(name: &str, err: TransformError) -> Response {
    warn!(
        name = %name,
        status = err.status().as_u16(),
        error = %err,
        "Request transformation failed"
    );
    err.into_response()
}
