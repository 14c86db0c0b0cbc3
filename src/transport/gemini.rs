// Google Gemini transport
//
// Talks to `models/{model}:generateContent`. Structured report requests set
// `responseMimeType` to JSON and pass the report schema along.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::retry::with_retry;
use super::{request_error, status_error, PromptRequest, Transport};
use crate::config::constants::DEFAULT_GEMINI_MODEL;
use crate::errors::{QrqcError, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Direct client for the Gemini REST API
#[derive(Clone)]
pub struct GeminiTransport {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTransport {
    pub fn new(api_key: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| QrqcError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at another host (tests, regional endpoints)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single request (no retry)
    async fn send_once(&self, request: &PromptRequest) -> Result<String> {
        let payload = GeminiRequest::from_prompt(request);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        tracing::debug!(
            "Sending {} turns + prompt to Gemini (structured: {})",
            request.history.len(),
            request.wants_structured_output()
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!("Gemini API request failed with status {}", status);
            return Err(status_error(status, &error_body));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            QrqcError::Transport(format!("failed to parse Gemini API response: {}", e))
        })?;

        gemini_response.into_text()
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn send_prompt(&self, request: &PromptRequest) -> Result<String> {
        with_retry(|| self.send_once(request)).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// Gemini API types, shared with the proxy relay which forwards the same payload

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

impl GeminiRequest {
    /// History turns followed by the prompt as the final user message
    pub fn from_prompt(request: &PromptRequest) -> Self {
        let mut contents: Vec<GeminiContent> = request
            .history
            .iter()
            .map(|turn| GeminiContent::text(turn.speaker.api_role(), &turn.text))
            .collect();
        contents.push(GeminiContent::text("user", &request.prompt));

        let generation_config =
            request
                .response_schema
                .as_ref()
                .map(|schema| GeminiGenerationConfig {
                    response_mime_type: Some("application/json".to_string()),
                    response_schema: Some(schema.clone()),
                });

        Self {
            contents,
            generation_config,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub(crate) struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

impl GeminiResponse {
    /// Text of the first part of the first candidate
    pub fn into_text(self) -> Result<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| {
                QrqcError::Transport("unexpected response structure: no candidate text".to_string())
            })
    }
}
