//! Configuration management for Parley
//!
//! Supports environment variables, config files, and runtime overrides.
//! The model section is an opaque `{type, config}` pair handed to the
//! provider factory untouched.
//!
//! Config file location: ~/.config/parley/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{ParleyError, Result};

/// Main configuration for Parley
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model provider selection
    #[serde(default)]
    pub model: ModelSpec,
    /// Agent configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Built-in tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Provider type plus provider-specific options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Provider type (ollama, openai, databricks)
    #[serde(rename = "type")]
    pub provider: String,
    /// Provider options (API keys, model name, temperature, max tokens)
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl ModelSpec {
    /// Create a spec for the given provider type with empty options
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            config: serde_json::Map::new(),
        }
    }

    /// Add an option
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Parse a spec from a JSON object such as `{"type": "openai", "config": {...}}`
    ///
    /// A missing `type` keeps the provider of `fallback`.
    pub fn from_json(json: &str, fallback: &ModelSpec) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ParleyError::config(format!("Invalid model JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| ParleyError::config("Model JSON must be an object"))?;

        if object.is_empty() {
            return Ok(fallback.clone());
        }

        let provider = object
            .get("type")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| fallback.provider.clone());

        let config = match object.get("config") {
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(_) => return Err(ParleyError::config("Model 'config' must be an object")),
            None => serde_json::Map::new(),
        };

        Ok(Self { provider, config })
    }

    /// Get a string option, falling back to an environment variable
    pub fn string_option(&self, key: &str, env_var: Option<&str>) -> Option<String> {
        self.config
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| env_var.and_then(|name| env::var(name).ok()))
            .filter(|s| !s.is_empty())
    }

    /// Get a numeric option
    pub fn f64_option(&self, key: &str) -> Option<f64> {
        self.config.get(key).and_then(|v| v.as_f64())
    }

    /// Get an unsigned integer option
    pub fn u64_option(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| v.as_u64())
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        let mut spec = Self::new(
            env::var("PARLEY_MODEL_TYPE").unwrap_or_else(|_| "openai".to_string()),
        );
        if let Ok(model) = env::var("PARLEY_MODEL") {
            spec.config
                .insert("model".to_string(), serde_json::Value::String(model));
        }
        spec
    }
}

/// Agent behavior configuration
///
/// Keys missing from the `[agent]` table keep their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum model invocations per message before giving up
    /// Default: 25
    pub max_iterations: usize,
    /// Time budget for one model request in seconds (0 = unbounded)
    /// Default: 300
    pub request_timeout_secs: u64,
    /// Time budget for one tool call in seconds (0 = unbounded)
    /// Default: 120
    pub tool_timeout_secs: u64,
    /// Whether to show debug output
    pub debug: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: env::var("PARLEY_MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(25),
            request_timeout_secs: 300,
            tool_timeout_secs: 120,
            debug: env::var("PARLEY_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Built-in tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Extra directories the read-only tools may access besides the working directory
    #[serde(default)]
    pub read_roots: Vec<PathBuf>,
    /// Program run by the `executeCli` tool; the tool is disabled when unset
    #[serde(default)]
    pub cli_program: Option<String>,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = Self::config_file();
        match Self::load_from_file(&config_path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %config_path.display(), "No config file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "Ignoring config file");
                Self::default()
            }
        }
    }

    /// Load configuration from a file; `Ok(None)` when the file does not exist
    pub fn load_from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ParleyError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content).map(Some)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ParleyError::config(format!("Failed to parse config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_agent_config() {
        let config = AgentConfig::default();
        assert_eq!(config.request_timeout_secs, 300);
        assert_eq!(config.tool_timeout_secs, 120);
    }

    #[test]
    fn test_config_from_toml() {
        let config = Config::from_toml(
            r#"
            [model]
            type = "ollama"
            [model.config]
            model = "llama3.1"
            temperature = 0.2

            [agent]
            max_iterations = 5
            request_timeout_secs = 10
            tool_timeout_secs = 5
            debug = true

            [tools]
            read_roots = ["/opt/shared"]
            cli_program = "aux4"
            "#,
        )
        .unwrap();

        assert_eq!(config.model.provider, "ollama");
        assert_eq!(config.model.config["model"], json!("llama3.1"));
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.tools.read_roots, vec![PathBuf::from("/opt/shared")]);
        assert_eq!(config.tools.cli_program.as_deref(), Some("aux4"));
    }

    #[test]
    fn test_partial_agent_section_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [model]
            type = "ollama"

            [agent]
            max_iterations = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.model.provider, "ollama");
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.request_timeout_secs, 300);
        assert_eq!(config.agent.tool_timeout_secs, 120);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(Config::load_from_file(&path).unwrap().is_none());

        fs::write(&path, "[agent]\ntool_timeout_secs = 7\n").unwrap();
        let config = Config::load_from_file(&path).unwrap().unwrap();
        assert_eq!(config.agent.tool_timeout_secs, 7);

        fs::write(&path, "[agent]\ntool_timeout_secs = \"soon\"\n").unwrap();
        assert!(Config::load_from_file(&path).is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("[agent\nmax_iterations = ").unwrap_err();
        assert!(matches!(err, ParleyError::Config(_)));
    }

    #[test]
    fn test_model_spec_from_json() {
        let fallback = ModelSpec::new("openai");
        let spec = ModelSpec::from_json(
            r#"{"type": "databricks", "config": {"model": "dbrx", "maxTokens": 256}}"#,
            &fallback,
        )
        .unwrap();
        assert_eq!(spec.provider, "databricks");
        assert_eq!(spec.u64_option("maxTokens"), Some(256));
        assert_eq!(spec.string_option("model", None).as_deref(), Some("dbrx"));

        let empty = ModelSpec::from_json("{}", &fallback).unwrap();
        assert_eq!(empty, fallback);

        assert!(ModelSpec::from_json("[1, 2]", &fallback).is_err());
        assert!(ModelSpec::from_json(r#"{"config": 3}"#, &fallback).is_err());
    }

    #[test]
    fn test_config_dir() {
        let dir = Config::config_dir();
        assert!(dir.to_string_lossy().contains("parley"));
    }
}
