// Common test utilities shared across test files

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri},
    response::Response,
    routing::any,
    Router,
};
use request_transform::RequestTransformLayer;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub const SEEN_METHOD: HeaderName = HeaderName::from_static("x-seen-method");
pub const SEEN_URI: HeaderName = HeaderName::from_static("x-seen-uri");
pub const SEEN_TRACE: HeaderName = HeaderName::from_static("x-seen-trace");
pub const SEEN_LENGTH: HeaderName = HeaderName::from_static("x-seen-content-length");

/// Counts how many requests reached the upstream handler
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

#[allow(dead_code)]
impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Router whose only route records what it received and echoes the body
/// back. Method, URI, `x-trace` and `Content-Length` come back as headers.
pub fn recording_app(layer: RequestTransformLayer) -> (Router, CallCounter) {
    let calls = CallCounter::default();
    let counter = calls.clone();

    let upstream = move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
        let counter = counter.clone();
        async move {
            counter.0.fetch_add(1, Ordering::SeqCst);

            let none = HeaderValue::from_static("none");
            let trace = headers.get("x-trace").cloned().unwrap_or(none.clone());
            let length = headers
                .get(header::CONTENT_LENGTH)
                .cloned()
                .unwrap_or(none);

            Response::builder()
                .header(SEEN_METHOD, method.as_str())
                .header(SEEN_URI, uri.to_string())
                .header(SEEN_TRACE, trace)
                .header(SEEN_LENGTH, length)
                .body(Body::from(body))
                .unwrap()
        }
    };

    let app = Router::new()
        .route("/", any(upstream.clone()))
        .route("/{*path}", any(upstream))
        .layer(layer);

    (app, calls)
}

#[allow(dead_code)]
pub fn pipeline_app(commands: &[&str]) -> (Router, CallCounter) {
    let config = request_transform::TransformConfig::commands(commands.iter().copied());
    recording_app(RequestTransformLayer::new(config).unwrap())
}

#[allow(dead_code)]
pub fn template_app(template: &str) -> (Router, CallCounter) {
    let config = request_transform::TransformConfig::template(template);
    recording_app(RequestTransformLayer::new(config).unwrap())
}

#[allow(dead_code)]
pub fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}
