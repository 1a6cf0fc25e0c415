use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Top-level configuration file for the transform server.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub transform: TransformConfig,
}

/// Settings for the surrounding server, not the transformation itself.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind
    pub listen: String,
    /// Maximum request body size accepted (bytes)
    pub max_body_size: usize,
    /// Request deadline (ms)
    pub timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Raw transform configuration: exactly one of `template` or `commands`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TransformConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
}

impl TransformConfig {
    pub fn template(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..Self::default()
        }
    }

    pub fn commands<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: Some(commands.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Label used in log fields
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("request-transform")
    }
}

/// Validated transformation mode.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformMode {
    Template { template: String },
    Pipeline { steps: Vec<String> },
}

impl TryFrom<TransformConfig> for TransformMode {
    type Error = ConfigError;

    fn try_from(value: TransformConfig) -> Result<Self, Self::Error> {
        match (value.template, value.commands) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousTransform),
            (None, None) => Err(ConfigError::MissingTransform),
            (Some(template), None) => {
                if template.is_empty() {
                    return Err(ConfigError::EmptyTemplate);
                }
                Ok(TransformMode::Template { template })
            }
            (None, Some(steps)) => {
                if steps.is_empty() {
                    return Err(ConfigError::EmptyCommands);
                }
                Ok(TransformMode::Pipeline { steps })
            }
        }
    }
}
