//! Generative language provider implementation
//!
//! The persona travels in `systemInstruction`, the assistant role is named
//! `model` on the wire, and the key is passed as a query parameter. The
//! model is resolved per call through [`ModelResolver`].

use crate::config::LlmConfig;
use crate::error::{CounselError, Result};
use crate::providers::base::{
    read_success_body, redact_key, ApiErrorBody, Dialect, Message, ModelInfo, Provider, Role,
};
use crate::providers::model_resolver::ModelResolver;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Provider for the generative language `generateContent` endpoint
#[derive(Clone)]
pub struct GenerativeLanguageProvider {
    client: Client,
    base_url: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    persona: String,
    resolver: ModelResolver,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Append `/v1beta` when the base URL carries no API version
///
/// # Examples
///
/// ```
/// use campus_counsel::providers::generative_language::normalize_base_url;
///
/// assert_eq!(
///     normalize_base_url("https://generativelanguage.googleapis.com"),
///     "https://generativelanguage.googleapis.com/v1beta"
/// );
/// assert_eq!(
///     normalize_base_url("https://generativelanguage.googleapis.com/v1/"),
///     "https://generativelanguage.googleapis.com/v1"
/// );
/// ```
pub fn normalize_base_url(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    if trimmed.ends_with("/v1beta") || trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{}/v1beta", trimmed)
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        Role::User | Role::System => "user",
    }
}

impl GenerativeLanguageProvider {
    /// Create a new generative language provider
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client carrying the request timeout
    /// * `config` - LLM configuration; `model` acts as a preference only
    /// * `persona` - System instruction sent with every request
    pub fn new(client: Client, config: &LlmConfig, persona: &str) -> Self {
        let base_url = normalize_base_url(&config.api_url);
        let api_key = config.api_key().unwrap_or_default().to_string();
        let resolver =
            ModelResolver::new(client.clone(), &base_url, &api_key, config.model.as_deref());

        tracing::info!(
            "Initialized generative language provider: url={}, preferred={:?}",
            base_url,
            resolver.preferred()
        );

        Self {
            client,
            base_url,
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            persona: persona.to_string(),
            resolver,
        }
    }

    /// Normalized base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(
        &'a self,
        history: &'a [Message],
        user_message: &'a str,
    ) -> GenerateContentRequest<'a> {
        let mut contents: Vec<Content<'a>> = history
            .iter()
            .map(|m| Content {
                role: wire_role(m.role),
                parts: vec![Part { text: &m.content }],
            })
            .collect();
        contents.push(Content {
            role: "user",
            parts: vec![Part { text: user_message }],
        });

        GenerateContentRequest {
            contents,
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: &self.persona,
                }],
            },
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }

    fn parse_reply(body: &str) -> Result<String> {
        let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
            tracing::error!("Failed to parse generateContent response: {}: {}", e, body);
            CounselError::MalformedResponse(format!("failed to parse response: {}", e))
        })?;

        if let Some(error) = parsed.error {
            tracing::error!("Gemini API error in body: {}", error.message);
            return Err(error.into_error("Gemini").into());
        }

        let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
            tracing::error!("generateContent response had no candidates: {}", body);
            CounselError::MalformedResponse("no candidates in response".to_string())
        })?;

        let part = candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .ok_or_else(|| {
                tracing::error!("generateContent candidate had no parts: {}", body);
                CounselError::MalformedResponse("no content parts in response".to_string())
            })?;

        Ok(part.text.unwrap_or_default())
    }
}

#[async_trait]
impl Provider for GenerativeLanguageProvider {
    async fn complete(&self, history: &[Message], user_message: &str) -> Result<String> {
        let model = self.resolver.resolve().await;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );
        let request = self.build_request(history, user_message);

        tracing::debug!(
            "Sending generateContent request to {}: {} contents",
            redact_key(&url),
            request.contents.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                tracing::error!("generateContent request failed: {}", e);
                CounselError::from_transport("generateContent request failed", e)
            })?;

        let body = read_success_body("Gemini", response).await?;
        Self::parse_reply(&body)
    }

    fn dialect(&self) -> Dialect {
        Dialect::GenerativeLanguage
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        self.resolver.discover().await
    }

    async fn current_model(&self) -> Result<String> {
        Ok(self.resolver.resolve().await)
    }
}
