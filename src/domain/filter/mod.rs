// Filter pipeline: ordered jq expressions, each fed the previous output

mod program;

pub use program::{check, first_output};

use serde_json::Value;
use tracing::trace;

use super::Cancellation;
use crate::error::{ConfigError, TransformError};

pub struct PipelineTransformer {
    steps: Vec<String>,
}

impl PipelineTransformer {
    /// Store the steps verbatim. They are compiled per request.
    pub fn new(steps: Vec<String>) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::EmptyCommands);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Compile every step without running anything.
    pub fn check(&self) -> Result<(), TransformError> {
        self.steps.iter().try_for_each(|step| check(step))
    }

    /// Run the steps in order. The first failing step aborts the pipeline.
    pub fn run(&self, input: Value, cancel: &Cancellation) -> Result<Value, TransformError> {
        let mut current = input;

        for (index, step) in self.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(TransformError::Cancelled);
            }
            current = first_output(step, current)?;
            trace!(step = index, filter = %step, "Filter step applied");
        }

        Ok(current)
    }

    /// Run the steps and encode the final value.
    pub fn apply(&self, input: Value, cancel: &Cancellation) -> Result<Vec<u8>, TransformError> {
        let output = self.run(input, cancel)?;
        serde_json::to_vec(&output).map_err(|e| TransformError::Encode(e.to_string()))
    }
}
