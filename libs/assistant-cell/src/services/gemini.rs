use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::{debug, error, instrument};

use shared_config::AppConfig;

use crate::models::AssistantError;

/// Single-shot prompt completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the generated text, which may be empty.
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError>;
}

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http_client: Client::new(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key: config.gemini_api_key.clone(),
        }
    }
}

/// Concatenates the text parts of the first candidate.
fn candidate_text(body: &Value) -> Result<String, AssistantError> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| AssistantError::InvalidResponse("no candidate parts".to_string()))?;

    Ok(parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("Calling text generation service at {}", url);

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .header(header::CONTENT_TYPE, "application/json")
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await?;
            error!("Text generation error ({}): {}", status, message);
            return Err(AssistantError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        candidate_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_are_joined() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "- How " }, { "text": "are you?" }] }
            }]
        });
        assert_eq!(candidate_text(&body).unwrap(), "- How are you?");
    }

    #[test]
    fn test_missing_candidates_is_invalid() {
        assert!(matches!(
            candidate_text(&json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
            Err(AssistantError::InvalidResponse(_))
        ));
    }
}
