// Abstract Syntax Tree types for body templates

use serde_json::Value;

/// Represents a parsed template as a list of parts
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub parts: Vec<TemplatePart>,
}

impl Template {
    pub fn new(parts: Vec<TemplatePart>) -> Self {
        Self { parts }
    }

    /// Get all actions in this template
    pub fn actions(&self) -> Vec<&Action> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Action(action) => Some(action),
                _ => None,
            })
            .collect()
    }
}

/// A template consists of literal text and `{{ ... }}` actions
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Action(Action),
}

/// A single action: an operand followed by the functions it is piped through
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub operand: Operand,
    pub functions: Vec<String>,
}

impl Action {
    pub fn new(operand: Operand) -> Self {
        Self {
            operand,
            functions: Vec::new(),
        }
    }

    pub fn with_functions(mut self, functions: Vec<String>) -> Self {
        self.functions = functions;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Dotted field path. An empty path is `.`, the whole context.
    Field(Vec<String>),
    Literal(Value),
}

impl Operand {
    pub fn dot() -> Self {
        Operand::Field(Vec::new())
    }

    pub fn field(path: &[&str]) -> Self {
        Operand::Field(path.iter().map(|s| s.to_string()).collect())
    }
}

/// Render a field path the way it appears in template source
pub fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        ".".to_string()
    } else {
        path.iter().map(|segment| format!(".{}", segment)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path() {
        assert_eq!(display_path(&[]), ".");
        assert_eq!(
            display_path(&["user".to_string(), "message".to_string()]),
            ".user.message"
        );
    }

    #[test]
    fn test_actions_skips_literals() {
        let template = Template::new(vec![
            TemplatePart::Literal("hello ".to_string()),
            TemplatePart::Action(Action::new(Operand::field(&["name"]))),
        ]);
        let actions = template.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].operand, Operand::field(&["name"]));
    }
}
