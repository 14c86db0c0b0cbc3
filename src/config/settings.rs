// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::constants::{
    DEFAULT_GEMINI_MODEL, DEFAULT_QUOTA_COOLDOWN_MINUTES, DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Which relay carries prompts to the generative API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Call the Gemini REST API directly with a local API key
    #[default]
    Gemini,
    /// Go through the site's proxy endpoint, which holds the credentials
    Proxy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    /// Gemini API key (only for `kind = "gemini"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name (only for `kind = "gemini"`)
    #[serde(default = "default_model")]
    pub model: String,

    /// Override for the Gemini base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Proxy endpoint, e.g. `https://example.org/wp-admin/admin-ajax.php`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,

    /// Nonce forwarded to the proxy with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Gemini,
            api_key: None,
            model: default_model(),
            base_url: None,
            proxy_url: None,
            nonce: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Locations of the two JSON documents read at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Prompts + response schema (URL or file path)
    pub prompts_url: String,
    /// Report layout template (URL or file path)
    pub template_url: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            prompts_url: "assets/json/qrqc_config.json".to_string(),
            template_url: "assets/json/qrqc_report_template.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where reports and exported transcripts are written
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

/// Optional server-side storage of finished reports
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Store reports without asking (consent given once in the config)
    #[serde(default)]
    pub always_consent: bool,

    /// Upload through the proxy's `store_report` action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,

    /// Copy reports into a local archive folder instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl StoreConfig {
    pub fn is_configured(&self) -> bool {
        self.proxy_url.is_some() || self.directory.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Minutes the assistant stays unavailable after the upstream rate-limits us
    #[serde(default = "default_cooldown")]
    pub cooldown_minutes: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: default_cooldown(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Directory for the daily usage log
    #[serde(default = "default_usage_dir")]
    pub usage_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            assets: AssetsConfig::default(),
            output: OutputConfig::default(),
            store: StoreConfig::default(),
            quota: QuotaConfig::default(),
            usage_dir: default_usage_dir(),
        }
    }
}

impl Config {
    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> anyhow::Result<()> {
        use crate::errors::wrap_error_with_suggestion;

        match self.transport.kind {
            TransportKind::Gemini => {
                let key = self.transport.api_key.as_deref().unwrap_or_default();
                if key.trim().is_empty() {
                    anyhow::bail!(wrap_error_with_suggestion(
                        "No Gemini API key configured",
                        "Set it in ~/.qrqc/config.toml:\n  \
                         [transport]\n  \
                         api_key = \"...\"\n\n\
                         or export GEMINI_API_KEY=\"...\""
                    ));
                }
                if self.transport.model.trim().is_empty() {
                    anyhow::bail!("transport.model must not be empty");
                }
            }
            TransportKind::Proxy => {
                let url = self.transport.proxy_url.as_deref().unwrap_or_default();
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!(wrap_error_with_suggestion(
                        format!("Invalid proxy URL: '{}'", url),
                        "transport.proxy_url must be an http(s) URL, e.g.\n  \
                         https://example.org/wp-admin/admin-ajax.php"
                    ));
                }
            }
        }

        if self.transport.timeout_secs == 0 {
            anyhow::bail!("transport.timeout_secs must be greater than 0");
        }

        if self.assets.prompts_url.trim().is_empty() || self.assets.template_url.trim().is_empty()
        {
            anyhow::bail!("assets.prompts_url and assets.template_url are both required");
        }

        if let Some(url) = &self.store.proxy_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("store.proxy_url must be an http(s) URL, got '{}'", url);
            }
        }

        Ok(())
    }
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_cooldown() -> u64 {
    DEFAULT_QUOTA_COOLDOWN_MINUTES
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_usage_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".qrqc").join("usage"))
        .unwrap_or_else(|| PathBuf::from(".qrqc/usage"))
}
