// Proxy relay transport
//
// The site's relay holds the API key. It takes a form-encoded POST with
// `action=gemini_proxy_request`, a nonce and the Gemini payload as
// `payload_json`, and answers `{"success": bool, "data": ...}` where `data`
// is the upstream response on success and an error message otherwise.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::gemini::{GeminiRequest, GeminiResponse};
use super::retry::with_retry;
use super::{request_error, status_error, PromptRequest, Transport};
use crate::errors::{QrqcError, Result};

const PROXY_ACTION: &str = "gemini_proxy_request";

#[derive(Clone)]
pub struct ProxyTransport {
    client: Client,
    url: String,
    nonce: Option<String>,
}

/// Envelope the relay wraps every answer in
#[derive(Debug, Deserialize)]
pub(crate) struct ProxyEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
}

impl ProxyEnvelope {
    /// Human-readable failure text carried in `data`
    pub fn error_message(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("error")
                .or_else(|| map.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| self.data.to_string()),
            Value::Null => "relay reported a failure".to_string(),
            other => other.to_string(),
        }
    }
}

impl ProxyTransport {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| QrqcError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            nonce: None,
        })
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    async fn send_once(&self, request: &PromptRequest) -> Result<String> {
        let payload = serde_json::to_string(&GeminiRequest::from_prompt(request))
            .map_err(|e| QrqcError::Transport(format!("failed to encode payload: {}", e)))?;

        let mut form: Vec<(&str, &str)> = vec![("action", PROXY_ACTION), ("payload_json", payload.as_str())];
        if let Some(nonce) = &self.nonce {
            form.push(("nonce", nonce.as_str()));
        }

        tracing::debug!("Relaying prompt through proxy {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        let envelope: Option<ProxyEnvelope> = serde_json::from_str(&body).ok();

        match envelope {
            Some(envelope) if envelope.success && status.is_success() => {
                // The relay forwards upstream error bodies as successful data
                if let Some(error) = upstream_error(&envelope.data) {
                    tracing::warn!("Upstream error relayed by proxy: {}", error);
                    return Err(error);
                }
                let upstream: GeminiResponse =
                    serde_json::from_value(envelope.data).map_err(|e| {
                        QrqcError::Transport(format!("unexpected relay payload: {}", e))
                    })?;
                upstream.into_text()
            }
            Some(envelope) => {
                let message = envelope.error_message();
                tracing::warn!("Proxy relay failed (HTTP {}): {}", status, message);
                if message.contains("HTTP 429") {
                    return Err(QrqcError::QuotaExceeded { until: None });
                }
                Err(status_error(status, &message))
            }
            None if !status.is_success() => Err(status_error(status, &body)),
            None => Err(QrqcError::Transport(
                "relay answered with a non-JSON body".to_string(),
            )),
        }
    }
}

/// Map a Gemini `{"error": {"code", "status", "message"}}` body to an error
fn upstream_error(data: &Value) -> Option<QrqcError> {
    let error = data.get("error")?.as_object()?;
    let code = error.get("code").and_then(Value::as_u64);
    let status = error.get("status").and_then(Value::as_str).unwrap_or_default();
    let message = error.get("message").and_then(Value::as_str).unwrap_or(status);

    if code == Some(429) || status == "RESOURCE_EXHAUSTED" {
        return Some(QrqcError::QuotaExceeded { until: None });
    }
    Some(QrqcError::Transport(match code {
        Some(code) => format!("upstream HTTP {}: {}", code, message),
        None => format!("upstream error: {}", message),
    }))
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn send_prompt(&self, request: &PromptRequest) -> Result<String> {
        with_retry(|| self.send_once(request)).await
    }

    fn name(&self) -> &str {
        "proxy"
    }
}
