//! Base provider trait and common types for Campus Counsel
//!
//! This module defines the Provider trait that both provider dialects
//! implement, along with the uniform message representation and the
//! helpers that turn provider failures into classified errors.

use crate::error::{CounselError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Host that identifies the generative language dialect
pub const GENERATIVE_LANGUAGE_HOST: &str = "generativelanguage.googleapis.com";

/// Role of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona / instruction message
    System,
    /// Message written by the student
    User,
    /// Message generated by the provider
    Assistant,
}

impl Role {
    /// Wire name in the uniform vocabulary
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use campus_counsel::providers::{Message, Role};
    ///
    /// let msg = Message::user("I feel overwhelmed");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Provider wire dialect
///
/// Selected once per configuration from the endpoint host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `POST {base}/chat/completions` with a `messages` array
    ChatCompletions,
    /// `POST {base}/models/{model}:generateContent` with a `contents` array
    GenerativeLanguage,
}

impl Dialect {
    /// Pick the dialect for a provider base URL
    ///
    /// # Examples
    ///
    /// ```
    /// use campus_counsel::providers::Dialect;
    ///
    /// assert_eq!(
    ///     Dialect::detect("https://generativelanguage.googleapis.com/v1beta"),
    ///     Dialect::GenerativeLanguage
    /// );
    /// assert_eq!(Dialect::detect("https://api.openai.com/v1"), Dialect::ChatCompletions);
    /// ```
    pub fn detect(api_url: &str) -> Self {
        let names_host = match url::Url::parse(api_url) {
            Ok(parsed) => parsed
                .host_str()
                .map(|h| h.to_ascii_lowercase().contains(GENERATIVE_LANGUAGE_HOST))
                .unwrap_or(false),
            Err(_) => api_url.contains(GENERATIVE_LANGUAGE_HOST),
        };

        if names_host {
            Self::GenerativeLanguage
        } else {
            Self::ChatCompletions
        }
    }

    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatCompletions => "chat_completions",
            Self::GenerativeLanguage => "generative_language",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model offered by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier without the `models/` prefix
    pub name: String,
    /// Display name for user-friendly presentation
    pub display_name: String,
}

/// Provider trait for chat completions
///
/// Implementations translate the uniform conversation into their wire
/// format, perform the HTTP call, and normalize the reply. They do not
/// retry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Produce one reply for `user_message` given the prior conversation
    ///
    /// # Arguments
    ///
    /// * `history` - Prior messages, alternating user/assistant, oldest first
    /// * `user_message` - The new message from the student
    ///
    /// # Errors
    ///
    /// Returns a classified [`CounselError`] when the call fails
    async fn complete(&self, history: &[Message], user_message: &str) -> Result<String>;

    /// Wire dialect spoken by this provider
    fn dialect(&self) -> Dialect;

    /// List the models this provider would choose from
    ///
    /// The default implementation returns an error indicating that
    /// model listing is not supported by this provider.
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Err(CounselError::Config(
            "Model listing is not supported by this provider".to_string(),
        )
        .into())
    }

    /// Resolve the model the next `complete` call would use
    async fn current_model(&self) -> Result<String>;
}

/// Error object some providers embed in an otherwise successful response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl ApiErrorBody {
    fn signals_rate_limit(&self) -> bool {
        let code_is_429 = match &self.code {
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(429),
            Some(serde_json::Value::String(s)) => s == "429" || s.contains("rate_limit"),
            _ => false,
        };
        code_is_429
            || self.status.as_deref() == Some("RESOURCE_EXHAUSTED")
            || self
                .kind
                .as_deref()
                .map(|k| k.contains("rate_limit"))
                .unwrap_or(false)
    }

    /// Classify an in-body provider error
    pub fn into_error(self, provider: &str) -> CounselError {
        if self.signals_rate_limit() {
            CounselError::RateLimited(format!("{} API error: {}", provider, self.message))
        } else {
            CounselError::UpstreamRejected {
                status: None,
                message: format!("{} API error: {}", provider, self.message),
            }
        }
    }
}

/// Classify a non-2xx provider response
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> CounselError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        CounselError::RateLimited(format!("{} returned status {}: {}", provider, status, body))
    } else {
        CounselError::UpstreamRejected {
            status: Some(status.as_u16()),
            message: format!("{} returned status {}: {}", provider, status, body),
        }
    }
}

/// Read a provider response body, classifying transport and status failures
pub(crate) async fn read_success_body(
    provider: &str,
    response: reqwest::Response,
) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| CounselError::from_transport("failed to read response", e.without_url()))?;

    if !status.is_success() {
        tracing::error!("{} returned error {}: {}", provider, status, body);
        return Err(status_error(provider, status, &body).into());
    }

    Ok(body)
}

/// Hide the `key` query parameter of a URL before logging it
///
/// # Examples
///
/// ```
/// use campus_counsel::providers::redact_key;
///
/// assert_eq!(
///     redact_key("https://host/v1beta/models?key=secret"),
///     "https://host/v1beta/models?key=REDACTED"
/// );
/// ```
pub fn redact_key(url: &str) -> String {
    match url.find("key=") {
        Some(idx) => {
            let start = idx + "key=".len();
            let end = url[start..]
                .find('&')
                .map(|offset| start + offset)
                .unwrap_or(url.len());
            format!("{}REDACTED{}", &url[..start], &url[end..])
        }
        None => url.to_string(),
    }
}
