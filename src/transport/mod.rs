// Transport to the generative API
//
// The engine only sees the `Transport` trait: prior turns plus a new prompt
// go in, reply text comes out. Two relays implement it, a direct Gemini
// client and the site's proxy endpoint that holds the credentials.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{TransportConfig, TransportKind};
use crate::conversation::ChatTurn;
use crate::errors::{QrqcError, Result};

pub mod gemini;
pub mod proxy;
pub mod quota;
pub mod retry;

pub use gemini::GeminiTransport;
pub use proxy::ProxyTransport;
pub use quota::{GatedTransport, QuotaGate};

/// One generative request
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// Turns already exchanged, oldest first
    pub history: Vec<ChatTurn>,
    /// Prompt appended after the history as a user message
    pub prompt: String,
    /// When set, ask for a JSON reply following this schema
    pub response_schema: Option<Value>,
}

impl PromptRequest {
    pub fn new(history: Vec<ChatTurn>, prompt: impl Into<String>) -> Self {
        Self {
            history,
            prompt: prompt.into(),
            response_schema: None,
        }
    }

    /// Request structured output conforming to `schema`
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn wants_structured_output(&self) -> bool {
        self.response_schema.is_some()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return the reply text (JSON text for structured requests)
    async fn send_prompt(&self, request: &PromptRequest) -> Result<String>;

    /// Relay name for logs ("gemini", "proxy", ...)
    fn name(&self) -> &str;
}

/// Build the transport selected in the configuration
pub fn create_transport(config: &TransportConfig) -> Result<Arc<dyn Transport>> {
    match config.kind {
        TransportKind::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| QrqcError::Config("no Gemini API key configured".to_string()))?;

            let mut transport = GeminiTransport::new(api_key, config.timeout_secs)?
                .with_model(config.model.clone());
            if let Some(base_url) = &config.base_url {
                transport = transport.with_base_url(base_url.clone());
            }
            Ok(Arc::new(transport))
        }
        TransportKind::Proxy => {
            let url = config
                .proxy_url
                .clone()
                .ok_or_else(|| QrqcError::Config("no proxy URL configured".to_string()))?;

            let mut transport = ProxyTransport::new(url, config.timeout_secs)?;
            if let Some(nonce) = &config.nonce {
                transport = transport.with_nonce(nonce.clone());
            }
            Ok(Arc::new(transport))
        }
    }
}

/// Classify an HTTP failure from the upstream or the relay
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> QrqcError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        return QrqcError::QuotaExceeded { until: None };
    }
    QrqcError::Transport(format!("HTTP {}: {}", status, truncate(body, 300)))
}

pub(crate) fn request_error(e: reqwest::Error) -> QrqcError {
    if e.is_timeout() {
        QrqcError::Transport("request timed out".to_string())
    } else {
        QrqcError::Transport(e.to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_prompt_request_builder() {
        let req = PromptRequest::new(vec![ChatTurn::user("hi")], "Ask a question");
        assert!(!req.wants_structured_output());

        let req = req.with_schema(serde_json::json!({"type": "OBJECT"}));
        assert!(req.wants_structured_output());
        assert_eq!(req.history.len(), 1);
    }

    #[test]
    fn test_status_error_classification() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            QrqcError::QuotaExceeded { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, r#"{"status":"RESOURCE_EXHAUSTED"}"#),
            QrqcError::QuotaExceeded { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            QrqcError::Transport(_)
        ));
    }

    #[test]
    fn test_create_transport_requires_key() {
        let config = TransportConfig::default();
        assert!(matches!(
            create_transport(&config),
            Err(QrqcError::Config(_))
        ));
    }

    #[test]
    fn test_create_proxy_transport() {
        let config = TransportConfig {
            kind: TransportKind::Proxy,
            proxy_url: Some("https://example.org/wp-admin/admin-ajax.php".to_string()),
            ..TransportConfig::default()
        };
        let transport = create_transport(&config).unwrap();
        assert_eq!(transport.name(), "proxy");
    }
}
