//! Provider module for Campus Counsel
//!
//! This module contains the provider abstraction, the two wire dialect
//! implementations, and the [`ChatGateway`] that the consultation service
//! calls for every reply.

pub mod base;
pub mod chat_completions;
pub mod generative_language;
pub mod model_resolver;

pub use base::{redact_key, Dialect, Message, ModelInfo, Provider, Role};
pub use chat_completions::ChatCompletionsProvider;
pub use generative_language::GenerativeLanguageProvider;
pub use model_resolver::ModelResolver;

use crate::config::LlmConfig;
use crate::error::{CounselError, Result};
use crate::prompts::{non_empty_reply, COUNSELOR_PERSONA};
use crate::telemetry::Telemetry;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Operator-facing message returned when no API key is configured
pub const MISSING_API_KEY_MESSAGE: &str =
    "LLM API key is not configured. Please set LLM_API_KEY in your environment variables";

/// Build the HTTP client shared by a provider and its model resolver
///
/// # Errors
///
/// Returns error if the client cannot be constructed
pub fn build_http_client(config: &LlmConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent("campus-counsel/0.2.0")
        .build()
        .map_err(|e| CounselError::Config(format!("Failed to create HTTP client: {}", e)))?;
    Ok(client)
}

/// Create a provider instance for the dialect implied by `config.api_url`
///
/// # Errors
///
/// Returns error if the HTTP client cannot be constructed
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn Provider>> {
    create_provider_with_dialect(Dialect::detect(&config.api_url), config)
}

/// Create a provider instance for an explicit dialect
///
/// # Errors
///
/// Returns error if the HTTP client cannot be constructed
pub fn create_provider_with_dialect(
    dialect: Dialect,
    config: &LlmConfig,
) -> Result<Box<dyn Provider>> {
    let client = build_http_client(config)?;
    let provider: Box<dyn Provider> = match dialect {
        Dialect::ChatCompletions => Box::new(ChatCompletionsProvider::new(
            client,
            config,
            COUNSELOR_PERSONA,
        )),
        Dialect::GenerativeLanguage => Box::new(GenerativeLanguageProvider::new(
            client,
            config,
            COUNSELOR_PERSONA,
        )),
    };
    Ok(provider)
}

/// Single entry point for consultation replies
///
/// Holds no provider when the API key is missing; every call then fails
/// with [`CounselError::ConfigurationMissing`] without touching the network.
pub struct ChatGateway {
    provider: Option<Box<dyn Provider>>,
    telemetry: Arc<dyn Telemetry>,
}

impl ChatGateway {
    /// Create a gateway from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: &LlmConfig, telemetry: Arc<dyn Telemetry>) -> Result<Self> {
        let provider = match config.api_key() {
            Some(_) => Some(create_provider(config)?),
            None => {
                tracing::warn!("{}", MISSING_API_KEY_MESSAGE);
                None
            }
        };
        Ok(Self {
            provider,
            telemetry,
        })
    }

    /// Create a gateway around an already-built provider
    pub fn with_provider(provider: Box<dyn Provider>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            provider: Some(provider),
            telemetry,
        }
    }

    /// Whether a credential was configured
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// The configured provider
    ///
    /// # Errors
    ///
    /// Returns [`CounselError::ConfigurationMissing`] if no key is set
    pub fn provider(&self) -> Result<&dyn Provider> {
        self.provider
            .as_deref()
            .ok_or_else(|| CounselError::ConfigurationMissing(MISSING_API_KEY_MESSAGE.to_string()).into())
    }

    /// Produce one reply for `user_message` given the prior conversation
    ///
    /// Empty replies are replaced with [`crate::prompts::FALLBACK_REPLY`].
    ///
    /// # Errors
    ///
    /// Returns a classified [`CounselError`]; no retries are attempted
    pub async fn send_chat(&self, history: &[Message], user_message: &str) -> Result<String> {
        let span = self.telemetry.start_span("send_chat");
        async {
            let provider = match self.provider() {
                Ok(provider) => provider,
                Err(e) => {
                    self.telemetry.record_error("send_chat", &e);
                    return Err(e);
                }
            };

            let dialect = provider.dialect();
            tracing::debug!(%dialect, history = history.len(), "Requesting consultation reply");

            let started = Instant::now();
            let result = provider.complete(history, user_message).await;
            self.telemetry.record_llm_call(dialect.as_str(), started.elapsed());

            match result {
                Ok(reply) => Ok(non_empty_reply(reply)),
                Err(e) => {
                    self.telemetry.record_error("send_chat", &e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{categorize, ErrorCategory};
    use crate::prompts::FALLBACK_REPLY;
    use crate::telemetry::TracingTelemetry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockProvider {
        reply: String,
        calls: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl Provider for MockProvider {
        async fn complete(&self, _history: &[Message], _user_message: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.reply.clone())
        }

        fn dialect(&self) -> Dialect {
            Dialect::ChatCompletions
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(vec![])
        }

        async fn current_model(&self) -> Result<String> {
            Ok("mock".to_string())
        }
    }

    #[test]
    fn test_create_provider_detects_dialect() {
        let config = LlmConfig {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dialect(), Dialect::ChatCompletions);

        let config = LlmConfig {
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.dialect(), Dialect::GenerativeLanguage);
    }

    #[tokio::test]
    async fn test_gateway_without_key_is_configuration_missing() {
        let gateway = ChatGateway::new(&LlmConfig::default(), TracingTelemetry::shared()).unwrap();
        assert!(!gateway.is_configured());

        let err = gateway.send_chat(&[], "hello").await.unwrap_err();
        assert_eq!(categorize(&err), ErrorCategory::ConfigurationMissing);
        assert_eq!(err.to_string(), MISSING_API_KEY_MESSAGE);
    }

    #[tokio::test]
    async fn test_gateway_blank_key_is_configuration_missing() {
        let config = LlmConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        let gateway = ChatGateway::new(&config, TracingTelemetry::shared()).unwrap();
        assert!(!gateway.is_configured());
    }

    #[tokio::test]
    async fn test_gateway_replaces_empty_reply() {
        let calls = Arc::new(Mutex::new(0));
        let gateway = ChatGateway::with_provider(
            Box::new(MockProvider {
                reply: "  ".to_string(),
                calls: calls.clone(),
            }),
            TracingTelemetry::shared(),
        );

        let reply = gateway.send_chat(&[], "hello").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_gateway_passes_reply_through() {
        let gateway = ChatGateway::with_provider(
            Box::new(MockProvider {
                reply: "Try breaking tasks down.".to_string(),
                calls: Arc::new(Mutex::new(0)),
            }),
            TracingTelemetry::shared(),
        );

        let reply = gateway
            .send_chat(&[Message::user("a"), Message::assistant("b")], "c")
            .await
            .unwrap();
        assert_eq!(reply, "Try breaking tasks down.");
    }
}
