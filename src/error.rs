// Error handling for request-transform

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Errors raised while building a transform layer from configuration.
///
/// These are fatal: a layer that fails to construct never serves traffic.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("template cannot be empty")]
    EmptyTemplate,

    #[error("commands cannot be empty")]
    EmptyCommands,

    #[error("either 'template' or 'commands' must be configured")]
    MissingTransform,

    #[error("'template' and 'commands' are mutually exclusive")]
    AmbiguousTransform,

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request transformation failures.
///
/// Every variant terminates the current request only. Only `Encode` and
/// `Internal` are reported as server errors; the rest are the caller's
/// problem as far as the HTTP contract goes.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Invalid JSON: {0}")]
    Decode(String),

    #[error("{0}")]
    Compile(String),

    #[error("{0}")]
    Execution(String),

    #[error("Filter '{0}' produced no output")]
    EmptyResult(String),

    #[error("Failed to encode result: {0}")]
    Encode(String),

    #[error("Transformation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransformError {
    pub fn status(&self) -> StatusCode {
        match self {
            TransformError::Decode(_)
            | TransformError::Compile(_)
            | TransformError::Execution(_)
            | TransformError::EmptyResult(_) => StatusCode::BAD_REQUEST,
            TransformError::Encode(_) | TransformError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TransformError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<serde_json::Error> for TransformError {
    fn from(err: serde_json::Error) -> Self {
        TransformError::Decode(err.to_string())
    }
}

// Plain-text error page, one response per failed request
impl IntoResponse for TransformError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{}\n", self),
        )
            .into_response()
    }
}
