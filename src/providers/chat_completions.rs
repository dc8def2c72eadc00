//! Chat-completions provider implementation
//!
//! Speaks the widely used `POST {base}/chat/completions` dialect: the
//! persona is inlined as the leading system message and the key travels
//! as a bearer token.

use crate::config::LlmConfig;
use crate::error::{CounselError, Result};
use crate::providers::base::{
    read_success_body, ApiErrorBody, Dialect, Message, ModelInfo, Provider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Model sent when the configuration names none
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Base URLs that must never receive a bearer header
const KEY_IN_QUERY_BASES: [&str; 2] = [
    "https://generativelanguage.googleapis.com/v1beta",
    "https://generativelanguage.googleapis.com/v1",
];

/// Provider for chat-completions compatible endpoints
///
/// # Examples
///
/// ```
/// use campus_counsel::config::LlmConfig;
/// use campus_counsel::providers::ChatCompletionsProvider;
///
/// let config = LlmConfig {
///     api_url: "https://api.openai.com/v1".to_string(),
///     api_key: Some("sk-test".to_string()),
///     ..Default::default()
/// };
/// let provider = ChatCompletionsProvider::new(reqwest::Client::new(), &config, "persona");
/// assert_eq!(provider.model(), "gpt-3.5-turbo");
/// ```
#[derive(Clone)]
pub struct ChatCompletionsProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    persona: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsProvider {
    /// Create a new chat-completions provider
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client carrying the request timeout
    /// * `config` - LLM configuration (URL, key, model, sampling)
    /// * `persona` - System prompt sent ahead of every conversation
    pub fn new(client: Client, config: &LlmConfig, persona: &str) -> Self {
        let model = config
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_CHAT_MODEL)
            .to_string();

        tracing::info!(
            "Initialized chat-completions provider: url={}, model={}",
            config.api_url,
            model
        );

        Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key().unwrap_or_default().to_string(),
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            persona: persona.to_string(),
        }
    }

    /// Model name sent with every request
    pub fn model(&self) -> &str {
        &self.model
    }

    fn sends_bearer(&self) -> bool {
        !KEY_IN_QUERY_BASES.contains(&self.base_url.as_str())
    }

    fn build_messages<'a>(
        &'a self,
        history: &'a [Message],
        user_message: &'a str,
    ) -> Vec<WireMessage<'a>> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage {
            role: "system",
            content: &self.persona,
        });
        messages.extend(history.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));
        messages.push(WireMessage {
            role: "user",
            content: user_message,
        });
        messages
    }

    fn parse_reply(body: &str) -> Result<String> {
        let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
            tracing::error!("Failed to parse chat-completions response: {}: {}", e, body);
            CounselError::MalformedResponse(format!("failed to parse response: {}", e))
        })?;

        if let Some(error) = parsed.error {
            tracing::error!("Chat-completions API error in body: {}", error.message);
            return Err(error.into_error("OpenAI").into());
        }

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            tracing::error!("Chat-completions response had no choices: {}", body);
            CounselError::MalformedResponse("no choices in response".to_string())
        })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    async fn complete(&self, history: &[Message], user_message: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: self.build_messages(history, user_message),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            "Sending chat-completions request: model={}, {} messages",
            self.model,
            request.messages.len()
        );

        let mut builder = self.client.post(&url).json(&request);
        if self.sends_bearer() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Chat-completions request failed: {}", e);
            CounselError::from_transport("chat-completions request failed", e)
        })?;

        let body = read_success_body("OpenAI", response).await?;
        Self::parse_reply(&body)
    }

    fn dialect(&self) -> Dialect {
        Dialect::ChatCompletions
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            name: self.model.clone(),
            display_name: self.model.clone(),
        }])
    }

    async fn current_model(&self) -> Result<String> {
        Ok(self.model.clone())
    }
}
