// Template module for rendering request bodies
//
// Templates use `{{ .field.path }}` actions over the decoded JSON body, with
// optional `| function` stages. They are parsed once, when the layer is built.

mod ast;
mod functions;
mod parser;
mod resolver;

pub use ast::{Action, Operand, Template, TemplatePart};
pub use functions::{FunctionRegistry, TemplateFunction};
pub use parser::TemplateParser;
pub use resolver::TemplateResolver;

use serde_json::Value;

use crate::error::{ConfigError, TransformError};

/// A parsed template plus the resolver that executes it
pub struct TemplateTransformer {
    template: Template,
    resolver: TemplateResolver,
}

impl TemplateTransformer {
    /// Parse `text`. Syntax errors fail construction.
    pub fn new(text: &str) -> Result<Self, ConfigError> {
        if text.is_empty() {
            return Err(ConfigError::EmptyTemplate);
        }
        let resolver = TemplateResolver::new();
        let template = TemplateParser::parse_with(text, resolver.registry())
            .map_err(|e| ConfigError::InvalidTemplate(e.to_string()))?;
        Ok(Self { template, resolver })
    }

    pub fn render(&self, data: &Value) -> Result<String, TransformError> {
        self.resolver
            .resolve(&self.template, data)
            .map_err(|e| TransformError::Execution(format!("Template execution error: {:#}", e)))
    }
}
