// Configuration loading

pub mod settings;

pub use settings::{AppConfig, ServerSettings, TransformConfig, TransformMode};

use std::path::Path;

use crate::error::ConfigError;

/// Load a configuration file, picking the format from the extension.
///
/// `.yaml` and `.yml` are parsed as YAML, anything else as JSON.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    if path
        .extension()
        .is_some_and(|e| e == "yaml" || e == "yml")
    {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

pub const EXAMPLE_CONFIG: &str = r#"# request-transform configuration
server:
  # Address to bind
  listen: "127.0.0.1:8080"
  # Maximum request body size (bytes)
  max_body_size: 10485760
  # Request deadline (ms)
  timeout_ms: 5000

transform:
  name: "greet"
  # Pipeline mode: jq filters applied in order, each on the previous output.
  # The final value replaces the request body before forwarding.
  commands:
    - '.user.message |= "hello, " + .'

  # Template mode (mutually exclusive with commands): the rendered text is
  # returned directly as the response body.
  # template: '{"message": "hello, {{ .user.message }}"}'
"#;
