// Template parser using recursive descent

use anyhow::{bail, Result};
use serde_json::Value;
use std::str::FromStr;

use super::ast::{Action, Operand, Template, TemplatePart};
use super::functions::FunctionRegistry;

pub struct TemplateParser<'a> {
    input: String,
    pos: usize,
    registry: &'a FunctionRegistry,
}

impl<'a> TemplateParser<'a> {
    /// Parse against the built-in function set
    pub fn parse(template: &str) -> Result<Template> {
        let registry = FunctionRegistry::new();
        TemplateParser::parse_with(template, &registry)
    }

    /// Parse, resolving function names against `registry`
    pub fn parse_with(template: &str, registry: &'a FunctionRegistry) -> Result<Template> {
        let mut parser = Self {
            input: template.to_string(),
            pos: 0,
            registry,
        };
        parser.parse_template()
    }

    fn parse_template(&mut self) -> Result<Template> {
        let mut parts = Vec::new();
        let mut literal_buf = String::new();

        while self.pos < self.input.len() {
            if self.starts_with("{{") {
                let start = self.pos;
                self.pos += 2;

                // {{- trims trailing whitespace of the preceding text
                if self.peek_char() == Some('-') && self.peek_ahead(1).is_some_and(char::is_whitespace)
                {
                    self.pos += 1;
                    literal_buf.truncate(literal_buf.trim_end().len());
                }

                // Flush literal buffer before the action
                if !literal_buf.is_empty() {
                    parts.push(TemplatePart::Literal(literal_buf.clone()));
                    literal_buf.clear();
                }

                let (action, trim_right) = self.parse_action(start)?;
                if let Some(action) = action {
                    parts.push(TemplatePart::Action(action));
                }

                // -}} trims leading whitespace of the following text
                if trim_right {
                    self.skip_whitespace();
                }
            } else {
                literal_buf.push(self.consume_char()?);
            }
        }

        // Flush remaining literal
        if !literal_buf.is_empty() {
            parts.push(TemplatePart::Literal(literal_buf));
        }

        Ok(Template::new(parts))
    }

    /// Parse the inside of an action up to and including the closing braces.
    /// Returns `None` for comments.
    fn parse_action(&mut self, start: usize) -> Result<(Option<Action>, bool)> {
        self.skip_whitespace();

        if self.starts_with("/*") {
            self.skip_comment(start)?;
            self.skip_whitespace();
            let trim_right = self.parse_close(start)?;
            return Ok((None, trim_right));
        }

        let (operand, mut functions) = self.parse_command(start)?;

        // Parse pipelines
        loop {
            self.skip_whitespace();
            if self.peek_char() != Some('|') {
                break;
            }
            self.consume_char()?; // consume |
            self.skip_whitespace();
            functions.push(self.parse_function_name()?);
        }

        self.skip_whitespace();
        let trim_right = self.parse_close(start)?;

        Ok((Some(Action::new(operand).with_functions(functions)), trim_right))
    }

    /// An operand, optionally preceded by a function name: `len .items`
    fn parse_command(&mut self, start: usize) -> Result<(Operand, Vec<String>)> {
        match self.peek_char() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.parse_identifier()?;
                match ident.as_str() {
                    "true" => Ok((Operand::Literal(Value::Bool(true)), Vec::new())),
                    "false" => Ok((Operand::Literal(Value::Bool(false)), Vec::new())),
                    "null" => Ok((Operand::Literal(Value::Null), Vec::new())),
                    name => {
                        if !self.registry.contains(name) {
                            bail!("function \"{}\" not defined", name);
                        }
                        self.skip_whitespace();
                        let operand = self.parse_operand(start)?;
                        Ok((operand, vec![name.to_string()]))
                    }
                }
            }
            _ => Ok((self.parse_operand(start)?, Vec::new())),
        }
    }

    fn parse_operand(&mut self, start: usize) -> Result<Operand> {
        match self.peek_char() {
            Some('.') => {
                self.consume_char()?; // consume .
                self.parse_field_path()
            }
            Some('"') => Ok(Operand::Literal(Value::String(self.parse_string()?))),
            Some(ch) if ch.is_ascii_digit() || ch == '-' => self.parse_number(),
            Some('}') | None => bail!("missing value for action at position {}", start),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.parse_identifier()?;
                match ident.as_str() {
                    "true" => Ok(Operand::Literal(Value::Bool(true))),
                    "false" => Ok(Operand::Literal(Value::Bool(false))),
                    "null" => Ok(Operand::Literal(Value::Null)),
                    _ => bail!(
                        "unexpected identifier '{}' as argument at position {}",
                        ident,
                        self.pos
                    ),
                }
            }
            Some(ch) => bail!(
                "unexpected '{}' in action at position {}",
                ch,
                self.pos
            ),
        }
    }

    // Called with the leading dot already consumed
    fn parse_field_path(&mut self) -> Result<Operand> {
        let mut path = Vec::new();

        if !self.peek_char().is_some_and(is_ident_char) {
            return Ok(Operand::Field(path));
        }

        path.push(self.parse_identifier()?);
        while self.peek_char() == Some('.') {
            self.consume_char()?; // consume .
            if !self.peek_char().is_some_and(is_ident_char) {
                bail!("expected field name after '.' at position {}", self.pos);
            }
            path.push(self.parse_identifier()?);
        }

        Ok(Operand::Field(path))
    }

    fn parse_string(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect_char('"')?;
        let mut value = String::new();

        loop {
            match self.peek_char() {
                Some('"') => {
                    self.consume_char()?;
                    return Ok(value);
                }
                Some('\\') => {
                    self.consume_char()?;
                    let escaped = match self.peek_char() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(ch) => bail!("unknown escape '\\{}' at position {}", ch, self.pos),
                        None => bail!("unterminated string starting at position {}", start),
                    };
                    self.consume_char()?;
                    value.push(escaped);
                }
                Some(_) => value.push(self.consume_char()?),
                None => bail!("unterminated string starting at position {}", start),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Operand> {
        let start = self.pos;
        let mut text = String::new();

        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E') {
                text.push(self.consume_char()?);
            } else {
                break;
            }
        }

        match serde_json::Number::from_str(&text) {
            Ok(number) => Ok(Operand::Literal(Value::Number(number))),
            Err(_) => bail!("invalid number '{}' at position {}", text, start),
        }
    }

    fn parse_function_name(&mut self) -> Result<String> {
        let name = self.parse_identifier()?;
        if !self.registry.contains(&name) {
            bail!("function \"{}\" not defined", name);
        }
        Ok(name)
    }

    fn skip_comment(&mut self, start: usize) -> Result<()> {
        match self.input[self.pos..].find("*/") {
            Some(offset) => {
                self.pos += offset + 2;
                Ok(())
            }
            None => bail!("unclosed comment starting at position {}", start),
        }
    }

    /// Consume `}}` or `-}}`, returning whether the trim marker was present
    fn parse_close(&mut self, start: usize) -> Result<bool> {
        if self.starts_with("-}}") {
            self.pos += 3;
            Ok(true)
        } else if self.starts_with("}}") {
            self.pos += 2;
            Ok(false)
        } else {
            match self.peek_char() {
                Some(ch) => bail!("unexpected '{}' in action at position {}", ch, self.pos),
                None => bail!("unclosed action starting at position {}", start),
            }
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let mut ident = String::new();

        while let Some(ch) = self.peek_char() {
            if is_ident_char(ch) {
                ident.push(self.consume_char()?);
            } else {
                break;
            }
        }

        if ident.is_empty() {
            bail!("Expected identifier at position {}", self.pos);
        }

        Ok(ident)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.input[self.pos..].starts_with(pattern)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn consume_char(&mut self) -> Result<char> {
        let ch = self.peek_char()
            .ok_or_else(|| anyhow::anyhow!("Unexpected end of input at position {}", self.pos))?;
        self.pos += ch.len_utf8();
        Ok(ch)
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.consume_char()?;
                Ok(())
            }
            Some(ch) => bail!(
                "Expected '{}' but found '{}' at position {}",
                expected,
                ch,
                self.pos
            ),
            None => bail!("Expected '{}' but found end of input", expected),
        }
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
