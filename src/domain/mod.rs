use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::config::TransformMode;
use crate::error::{ConfigError, TransformError};

pub mod filter;
pub mod template;

use filter::PipelineTransformer;
use template::TemplateTransformer;

// Domain model for body transformations
// Uses enum instead of trait: the mode is picked once, when the layer is built

pub enum Transformer {
    Template(TemplateTransformer),
    Pipeline(PipelineTransformer),
}

/// Output of a successful transformation
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    /// Rendered template text, written directly as the response
    Rendered(String),
    /// Encoded pipeline output, forwarded as the new request body
    Json(Vec<u8>),
}

impl Transformer {
    pub fn new(mode: TransformMode) -> Result<Self, ConfigError> {
        match mode {
            TransformMode::Template { template } => {
                Ok(Transformer::Template(TemplateTransformer::new(&template)?))
            }
            TransformMode::Pipeline { steps } => {
                Ok(Transformer::Pipeline(PipelineTransformer::new(steps)?))
            }
        }
    }

    /// Whether the result answers the request instead of being forwarded
    pub fn is_terminal(&self) -> bool {
        matches!(self, Transformer::Template(_))
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Transformer::Template(_) => "template",
            Transformer::Pipeline(_) => "pipeline",
        }
    }

    /// Decode a request body. Templates need a JSON object at the top level;
    /// pipelines accept any JSON value.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, TransformError> {
        match self {
            Transformer::Template(_) => {
                let map: serde_json::Map<String, Value> = serde_json::from_slice(bytes)?;
                Ok(Value::Object(map))
            }
            Transformer::Pipeline(_) => Ok(serde_json::from_slice(bytes)?),
        }
    }

    pub fn apply(&self, input: Value, cancel: &Cancellation) -> Result<Transformed, TransformError> {
        match self {
            Transformer::Template(template) => template.render(&input).map(Transformed::Rendered),
            Transformer::Pipeline(pipeline) => pipeline.apply(input, cancel).map(Transformed::Json),
        }
    }
}

/// Shared flag telling a running transformation to stop at the next step
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
