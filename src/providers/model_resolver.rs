//! Model selection for the generative language dialect
//!
//! The model name is not fixed in configuration. Before every chat call the
//! resolver lists the provider's models, filters them, and picks one by
//! preference order. Discovery failure never blocks the chat call: it
//! degrades to [`DEFAULT_MODEL`].

use crate::error::{CounselError, Result};
use crate::providers::base::{read_success_body, redact_key, ModelInfo};
use reqwest::Client;
use serde::Deserialize;

/// Model used when discovery fails or yields no candidates
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Preference order: fast model first, then stable, then larger
pub const PREFERRED_MODELS: [&str; 3] = ["gemini-1.5-flash", "gemini-pro", "gemini-1.5-pro"];

const GENERATE_CONTENT: &str = "generateContent";

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModel {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Whether a model name marks an experimental model
///
/// # Examples
///
/// ```
/// use campus_counsel::providers::model_resolver::is_experimental;
///
/// assert!(is_experimental("gemini-2.0-flash-exp"));
/// assert!(!is_experimental("gemini-1.5-flash"));
/// ```
pub fn is_experimental(name: &str) -> bool {
    name.contains("-exp") || name.contains("experimental")
}

/// Pick a model from the discovered candidates
///
/// Returns the first entry of `preferred` present among the candidates,
/// else the first candidate, else [`DEFAULT_MODEL`].
pub fn select_model(candidates: &[ModelInfo], preferred: &[String]) -> String {
    preferred
        .iter()
        .find(|p| candidates.iter().any(|c| &c.name == *p))
        .cloned()
        .or_else(|| candidates.first().map(|c| c.name.clone()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// Resolves the model used for each generative language call
#[derive(Clone)]
pub struct ModelResolver {
    client: Client,
    base_url: String,
    api_key: String,
    preferred: Vec<String>,
}

impl ModelResolver {
    /// Create a resolver
    ///
    /// A `pinned` model goes to the head of the preference order; it is only
    /// used when the provider lists it.
    pub fn new(client: Client, base_url: &str, api_key: &str, pinned: Option<&str>) -> Self {
        let mut preferred: Vec<String> = Vec::with_capacity(PREFERRED_MODELS.len() + 1);
        if let Some(pin) = pinned.map(str::trim).filter(|p| !p.is_empty()) {
            preferred.push(pin.trim_start_matches("models/").to_string());
        }
        for name in PREFERRED_MODELS {
            if !preferred.iter().any(|p| p == name) {
                preferred.push(name.to_string());
            }
        }

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            preferred,
        }
    }

    /// Preference order in effect
    pub fn preferred(&self) -> &[String] {
        &self.preferred
    }

    /// List non-experimental models that support content generation
    ///
    /// # Errors
    ///
    /// Returns an error if the listing call fails or cannot be decoded
    pub async fn discover(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models?key={}", self.base_url, self.api_key);
        tracing::debug!("Discovering models: {}", redact_key(&url));

        let response = self.client.get(&url).send().await.map_err(|e| {
            CounselError::from_transport("model discovery request failed", e.without_url())
        })?;
        let body = read_success_body("Gemini model listing", response).await?;

        let listing: ListModelsResponse = serde_json::from_str(&body).map_err(|e| {
            CounselError::MalformedResponse(format!("failed to parse model listing: {}", e))
        })?;

        let models = listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_CONTENT)
            })
            .map(|m| {
                let name = m.name.trim_start_matches("models/").to_string();
                let display_name = if m.display_name.is_empty() {
                    name.clone()
                } else {
                    m.display_name
                };
                ModelInfo { name, display_name }
            })
            .filter(|m| !is_experimental(&m.name))
            .collect();

        Ok(models)
    }

    /// Resolve the model for the next chat call
    ///
    /// Never fails: any discovery error falls back to [`DEFAULT_MODEL`].
    pub async fn resolve(&self) -> String {
        match self.discover().await {
            Ok(candidates) if candidates.is_empty() => {
                tracing::warn!(
                    "Model discovery returned no usable models, using {}",
                    DEFAULT_MODEL
                );
                DEFAULT_MODEL.to_string()
            }
            Ok(candidates) => {
                let model = select_model(&candidates, &self.preferred);
                tracing::debug!("Selected model {} from {} candidates", model, candidates.len());
                model
            }
            Err(e) => {
                tracing::warn!("Model discovery failed, using {}: {:#}", DEFAULT_MODEL, e);
                DEFAULT_MODEL.to_string()
            }
        }
    }
}
