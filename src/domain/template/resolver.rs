// Template execution against a JSON context

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::ast::{display_path, Action, Operand, Template, TemplatePart};
use super::functions::{render_text, FunctionRegistry};

/// Executes parsed templates against a JSON value
pub struct TemplateResolver {
    registry: FunctionRegistry,
}

impl TemplateResolver {
    pub fn new() -> Self {
        Self {
            registry: FunctionRegistry::new(),
        }
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Render the template with `data` as the context (`.`)
    pub fn resolve(&self, template: &Template, data: &Value) -> Result<String> {
        let mut result = String::new();

        for part in &template.parts {
            match part {
                TemplatePart::Literal(s) => result.push_str(s),
                TemplatePart::Action(action) => {
                    let value = self.evaluate(action, data)?;
                    result.push_str(&render_text(&value));
                }
            }
        }

        Ok(result)
    }

    fn evaluate(&self, action: &Action, data: &Value) -> Result<Value> {
        let mut value = match &action.operand {
            Operand::Field(path) => lookup(data, path)?.clone(),
            Operand::Literal(literal) => literal.clone(),
        };

        for name in &action.functions {
            let function = self
                .registry
                .get(name)
                .with_context(|| format!("function \"{}\" not defined", name))?;
            value = function
                .apply(value)
                .with_context(|| format!("error calling {}", name))?;
        }

        Ok(value)
    }
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Descend `data` along `path`. Missing keys are errors.
fn lookup<'v>(data: &'v Value, path: &[String]) -> Result<&'v Value> {
    let mut current = data;

    for (depth, key) in path.iter().enumerate() {
        let at = display_path(&path[..=depth]);
        current = match current {
            Value::Object(map) => match map.get(key) {
                Some(next) => next,
                None => bail!("at <{}>: map has no entry for key \"{}\"", at, key),
            },
            Value::Null => bail!("at <{}>: nil pointer evaluating field {}", at, key),
            other => bail!(
                "at <{}>: can't evaluate field {} in type {}",
                at,
                key,
                type_name(other)
            ),
        };
    }

    Ok(current)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::parser::TemplateParser;
    use serde_json::json;

    fn render(template: &str, data: Value) -> Result<String> {
        let template = TemplateParser::parse(template).unwrap();
        TemplateResolver::new().resolve(&template, &data)
    }

    #[test]
    fn test_resolve_nested_field() {
        let result = render(
            r#"{"message": "hello, {{ .user.message }}"}"#,
            json!({"user": {"message": "world"}}),
        )
        .unwrap();
        assert_eq!(result, r#"{"message": "hello, world"}"#);
    }

    #[test]
    fn test_resolve_dot_renders_json() {
        let result = render("{{ . }}", json!({"a": [1, true, null]})).unwrap();
        assert_eq!(result, r#"{"a":[1,true,null]}"#);
    }

    #[test]
    fn test_resolve_scalars() {
        let result = render(
            "{{ .n }} {{ .b }} {{ .z }} {{ .s }}",
            json!({"n": 1.5, "b": false, "z": null, "s": "text"}),
        )
        .unwrap();
        assert_eq!(result, "1.5 false null text");
    }

    #[test]
    fn test_resolve_json_function_quotes_strings() {
        let result = render(
            r#"{"echo": {{ .msg | json }}}"#,
            json!({"msg": "line \"one\"\nline two"}),
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["echo"], "line \"one\"\nline two");
    }

    #[test]
    fn test_resolve_pipeline_chain() {
        let result = render("{{ .name | trim | upper }}", json!({"name": "  ada  "})).unwrap();
        assert_eq!(result, "ADA");
    }

    #[test]
    fn test_resolve_prefix_len() {
        let result = render("{{ len .items }}", json!({"items": [1, 2, 3]})).unwrap();
        assert_eq!(result, "3");
    }

    #[test]
    fn test_resolve_literal_operand() {
        let result = render(r#"{{ "a b" | urlquery }}"#, json!({})).unwrap();
        assert_eq!(result, "a%20b");
    }

    #[test]
    fn test_resolve_missing_key_fails() {
        let err = render("{{ .user.missing }}", json!({"user": {}})).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("<.user.missing>"));
        assert!(message.contains("map has no entry for key \"missing\""));
    }

    #[test]
    fn test_resolve_field_on_scalar_fails() {
        let err = render("{{ .user.name }}", json!({"user": "bob"})).unwrap_err();
        assert!(err
            .to_string()
            .contains("can't evaluate field name in type string"));
    }

    #[test]
    fn test_resolve_field_on_null_fails() {
        let err = render("{{ .user.name }}", json!({"user": null})).unwrap_err();
        assert!(err.to_string().contains("nil pointer evaluating field name"));
    }

    #[test]
    fn test_resolve_function_error_is_reported() {
        let err = render("{{ .n | upper }}", json!({"n": 1})).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("error calling upper"));
        assert!(chain.contains("upper expects a string"));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let template = TemplateParser::parse("{{ .a }}-{{ .b }}").unwrap();
        let resolver = TemplateResolver::new();
        let data = json!({"a": 1, "b": 2});
        let first = resolver.resolve(&template, &data).unwrap();
        let second = resolver.resolve(&template, &data).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "1-2");
    }
}
