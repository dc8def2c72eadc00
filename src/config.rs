//! Configuration management for Campus Counsel
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Configuration is loaded once at startup and is read-only afterwards.

use crate::error::{CounselError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Campus Counsel
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Consultation behavior configuration
    #[serde(default)]
    pub consultation: ConsultationConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// LLM provider configuration
///
/// The dialect used to talk to the provider is derived from `api_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider base URL (e.g. `https://api.openai.com/v1`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Provider credential; consultation calls fail without it
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional model identifier
    ///
    /// Chat-completions endpoints send it verbatim. For the generative
    /// language endpoint it is only a preference: discovery still runs.
    #[serde(default)]
    pub model: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: None,
            timeout_seconds: default_timeout_seconds(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmConfig {
    /// The configured API key, treating blank values as absent
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the API listens on
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Consultation behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationConfig {
    /// Maximum accepted user message length, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

fn default_max_message_chars() -> usize {
    4000
}

impl Default for ConsultationConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite database path; the user data directory is used when unset
    #[serde(default)]
    pub db_path: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CounselError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CounselError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Some(api_url) = env_non_empty("LLM_API_URL").or_else(|| env_non_empty("GEMINI_API_URL"))
        {
            self.llm.api_url = api_url;
        }

        if let Some(api_key) = env_non_empty("LLM_API_KEY").or_else(|| env_non_empty("GEMINI_API_KEY"))
        {
            self.llm.api_key = Some(api_key);
        }

        if let Some(model) = env_non_empty("LLM_MODEL") {
            self.llm.model = Some(model);
        }

        if let Some(timeout) = env_non_empty("LLM_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(v) => self.llm.timeout_seconds = v,
                Err(_) => tracing::warn!("Invalid LLM_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Some(bind) = env_non_empty("CAMPUS_COUNSEL_BIND") {
            self.server.bind = bind;
        } else if let Some(port) = env_non_empty("PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.bind = format!("0.0.0.0:{}", p),
                Err(_) => tracing::warn!("Invalid PORT: {}", port),
            }
        }

        if let Some(db_path) = env_non_empty("CAMPUS_COUNSEL_HISTORY_DB") {
            tracing::debug!(db_path = %db_path, "Env override: CAMPUS_COUNSEL_HISTORY_DB");
            self.storage.db_path = Some(db_path);
        }

        if let Some(max_chars) = env_non_empty("CAMPUS_COUNSEL_MAX_MESSAGE_CHARS") {
            match max_chars.parse() {
                Ok(v) => self.consultation.max_message_chars = v,
                Err(_) => tracing::warn!("Invalid CAMPUS_COUNSEL_MAX_MESSAGE_CHARS: {}", max_chars),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(db_path) = &cli.storage_path {
            self.storage.db_path = Some(db_path.clone());
        }
        if let crate::cli::Commands::Serve { bind: Some(bind) } = &cli.command {
            self.server.bind = bind.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails. A missing API key is
    /// not a validation failure: the service starts and consultation calls
    /// report the missing credential instead.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_url.trim().is_empty() {
            return Err(CounselError::Config("llm.api_url cannot be empty".to_string()).into());
        }

        let parsed = url::Url::parse(&self.llm.api_url).map_err(|e| {
            CounselError::Config(format!("llm.api_url is not a valid URL: {}", e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CounselError::Config(format!(
                "llm.api_url must use http or https, got {}",
                parsed.scheme()
            ))
            .into());
        }

        if self.llm.timeout_seconds == 0 {
            return Err(
                CounselError::Config("llm.timeout_seconds must be greater than 0".to_string())
                    .into(),
            );
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(CounselError::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if self.llm.max_tokens == 0 {
            return Err(
                CounselError::Config("llm.max_tokens must be greater than 0".to_string()).into(),
            );
        }

        if self.consultation.max_message_chars == 0 || self.consultation.max_message_chars > 32_000
        {
            return Err(CounselError::Config(
                "consultation.max_message_chars must be between 1 and 32000".to_string(),
            )
            .into());
        }

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(CounselError::Config(format!(
                "server.bind is not a valid socket address: {}",
                self.server.bind
            ))
            .into());
        }

        if self.llm.api_key().is_none() {
            tracing::warn!(
                "LLM_API_KEY is not set; consultation requests will be answered with a service-unavailable message"
            );
        }

        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
