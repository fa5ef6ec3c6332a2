//! Answer generation via the Gemini `generateContent` endpoint.

use async_trait::async_trait;
use serde_json::json;

use crate::error::{AssistantError, Result, ServiceKind};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Generate an answer for a fully assembled prompt. An empty model
    /// response is a service fault, not an empty answer.
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}

pub struct GeminiCompletion {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiCompletion {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompletionGateway for GeminiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }]
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::service(ServiceKind::Completion, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::service(
                ServiceKind::Completion,
                format!("gemini returned {status}: {body}"),
            ));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::service(ServiceKind::Completion, e.to_string()))?;

        extract_gemini_text(&value).ok_or_else(|| {
            AssistantError::service(ServiceKind::Completion, "empty model response")
        })
    }

    fn name(&self) -> &str {
        "gemini-completion"
    }
}

/// Pull the concatenated text parts out of a `generateContent` response.
/// Returns `None` when the response carries no usable text.
pub(crate) fn extract_gemini_text(value: &serde_json::Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
