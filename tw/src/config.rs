//! Ticketwright configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Main Ticketwright configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when no `--log-level` flag is given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Deployment environment
    pub environment: Environment,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Clarification pipeline settings
    pub pipeline: PipelineConfig,

    /// HTTP endpoint settings
    pub server: ServerConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that a credential can be resolved. Call this early in startup to
    /// fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        if self.llm.get_api_key().is_none() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable or llm.api-key-file.",
                self.llm.api_key_env
            ));
        }
        if self.pipeline.completion_timeout_ms == 0 {
            return Err(eyre::eyre!("pipeline.completion-timeout-ms must be greater than zero"));
        }
        Ok(())
    }

    /// Whether raw/cleaned payload previews may be written to the log
    pub fn previews_enabled(&self) -> bool {
        self.pipeline.log_previews && self.environment != Environment::Production
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .ticketwright.yml
        let local_config = PathBuf::from(".ticketwright.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/ticketwright/ticketwright.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("ticketwright").join("ticketwright.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "openai" supported)
    pub provider: String,

    /// Model identifier used when a request names none
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// File containing the API key; takes precedence over the environment
    #[serde(rename = "api-key-file")]
    pub api_key_file: Option<PathBuf>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// HTTP request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries of transient transport failures (5xx, network) inside the client
    #[serde(rename = "max-transport-retries")]
    pub max_transport_retries: u32,
}

impl LlmConfig {
    /// Resolve the configured credential, file first, then environment
    pub fn get_api_key(&self) -> Option<String> {
        debug!(api_key_env = %self.api_key_env, "LlmConfig::get_api_key: called");
        if let Some(path) = &self.api_key_file {
            match fs::read_to_string(path) {
                Ok(key) if !key.trim().is_empty() => {
                    debug!("LlmConfig::get_api_key: using key file");
                    return Some(key.trim().to_string());
                }
                Ok(_) => debug!("LlmConfig::get_api_key: key file is empty"),
                Err(e) => tracing::warn!("Failed to read API key file {}: {}", path.display(), e),
            }
        }

        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key_file: None,
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 2048,
            timeout_ms: 30_000,
            max_transport_retries: 2,
        }
    }
}

/// How the model is asked to return its structured answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// `response_format: json_object`
    #[default]
    Json,
    /// Forced `submit_ticket` function call
    Tool,
    /// Plain text; the prompt alone asks for JSON
    Plain,
}

/// Clarification pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Clarification rounds before the loop gives up
    #[serde(rename = "max-clarification-rounds")]
    pub max_clarification_rounds: usize,

    /// Upper bound on a single completion call in milliseconds
    #[serde(rename = "completion-timeout-ms")]
    pub completion_timeout_ms: u64,

    /// Structured output mode
    #[serde(rename = "output-mode")]
    pub output_mode: OutputMode,

    /// Log bounded previews of model output at debug level
    #[serde(rename = "log-previews")]
    pub log_previews: bool,

    /// Directory searched first for `.pmt` prompt overrides
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_clarification_rounds: 3,
            completion_timeout_ms: 30_000,
            output_mode: OutputMode::Json,
            log_previews: true,
            prompts_dir: None,
        }
    }
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}
