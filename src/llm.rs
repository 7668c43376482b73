//! Generative model client used to answer dataset questions.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;

/// failures while talking to the model or looking up search state
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Dataset '{0}' not indexed. Please index the dataset first.")]
    NotIndexed(String),

    #[error("LLM not configured, set GOOGLE_API_KEY")]
    NotConfigured,

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Model returned no text")]
    EmptyResponse,
}

/// anything that can turn a prompt into text
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, SearchError>;
}

/// Gemini `generateContent` over plain HTTPS
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `None` when no api key is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        config.google_api_key.as_ref().map(|key| {
            Self::new(
                key.clone(),
                config.gemini_model.clone(),
                config.gemini_base_url.clone(),
            )
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, SearchError> {
        let request = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        tracing::debug!("Sending {} char prompt to {}", prompt.len(), self.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            tracing::error!("Gemini API error {}: {}", status, body);
            return Err(SearchError::Api { status, body });
        }

        let response_json: serde_json::Value = response.json().await?;
        extract_text(&response_json).ok_or(SearchError::EmptyResponse)
    }
}

// candidates[0].content.parts[*].text, joined
fn extract_text(response: &serde_json::Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    (!text.is_empty()).then_some(text)
}
