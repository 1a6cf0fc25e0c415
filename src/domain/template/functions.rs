// Template functions and their registry

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::HashMap;

/// A function that an action value can be piped through: `{{ .name | upper }}`
pub trait TemplateFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, value: Value) -> Result<Value>;
}

/// Text form of a value: strings verbatim, everything else as compact JSON
pub fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

/// Encode the value as JSON text, so strings come out quoted and escaped
pub struct JsonFn;

impl TemplateFunction for JsonFn {
    fn name(&self) -> &'static str {
        "json"
    }

    fn apply(&self, value: Value) -> Result<Value> {
        Ok(Value::String(serde_json::to_string(&value)?))
    }
}

/// Length of a string, array or map
pub struct LenFn;

impl TemplateFunction for LenFn {
    fn name(&self) -> &'static str {
        "len"
    }

    fn apply(&self, value: Value) -> Result<Value> {
        let len = match &value {
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            other => bail!("len of type {}", kind(other)),
        };
        Ok(Value::from(len))
    }
}

/// Percent-encode the text form of the value
pub struct UrlQueryFn;

impl TemplateFunction for UrlQueryFn {
    fn name(&self) -> &'static str {
        "urlquery"
    }

    fn apply(&self, value: Value) -> Result<Value> {
        Ok(Value::String(
            urlencoding::encode(&render_text(&value)).into_owned(),
        ))
    }
}

macro_rules! string_fn {
    ($ty:ident, $name:literal, $op:expr) => {
        pub struct $ty;

        impl TemplateFunction for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn apply(&self, value: Value) -> Result<Value> {
                match value {
                    Value::String(s) => Ok(Value::String(($op)(s.as_str()))),
                    other => bail!("{} expects a string, got {}", $name, kind(&other)),
                }
            }
        }
    };
}

string_fn!(TrimFn, "trim", |s: &str| s.trim().to_string());
string_fn!(UpperFn, "upper", |s: &str| s.to_uppercase());
string_fn!(LowerFn, "lower", |s: &str| s.to_lowercase());

/// Registry for template functions
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Box<dyn TemplateFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };
        registry.register(Box::new(JsonFn));
        registry.register(Box::new(LenFn));
        registry.register(Box::new(UrlQueryFn));
        registry.register(Box::new(TrimFn));
        registry.register(Box::new(UpperFn));
        registry.register(Box::new(LowerFn));
        registry
    }

    pub fn register(&mut self, function: Box<dyn TemplateFunction>) {
        self.functions.insert(function.name(), function);
    }

    pub fn get(&self, name: &str) -> Option<&dyn TemplateFunction> {
        self.functions.get(name).map(|b| b.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_fn() {
        assert_eq!(
            JsonFn.apply(json!("say \"hi\"")).unwrap(),
            json!("\"say \\\"hi\\\"\"")
        );
        assert_eq!(JsonFn.apply(json!({"a": [1, 2]})).unwrap(), json!("{\"a\":[1,2]}"));
    }

    #[test]
    fn test_len_fn() {
        assert_eq!(LenFn.apply(json!([1, 2, 3])).unwrap(), json!(3));
        assert_eq!(LenFn.apply(json!("héllo")).unwrap(), json!(5));
        assert_eq!(LenFn.apply(json!({"a": 1})).unwrap(), json!(1));
        assert!(LenFn.apply(json!(42)).is_err());
    }

    #[test]
    fn test_string_fns() {
        assert_eq!(TrimFn.apply(json!("  hello  ")).unwrap(), json!("hello"));
        assert_eq!(UpperFn.apply(json!("hello")).unwrap(), json!("HELLO"));
        assert_eq!(LowerFn.apply(json!("HeLLo")).unwrap(), json!("hello"));

        let err = TrimFn.apply(json!(1)).unwrap_err();
        assert!(err.to_string().contains("trim expects a string, got number"));
    }

    #[test]
    fn test_urlquery_fn() {
        assert_eq!(
            UrlQueryFn.apply(json!("hello world")).unwrap(),
            json!("hello%20world")
        );
        assert_eq!(UrlQueryFn.apply(json!(12)).unwrap(), json!("12"));
    }

    #[test]
    fn test_registry() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("json").is_some());
        assert!(registry.get("trim").is_some());
        assert!(registry.contains("urlquery"));
        assert!(registry.get("unknown").is_none());
    }
}
