// Startup documents: prompts + schema, and the report layout template
//
// Both are fetched once per session and shared read-only afterwards.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::prompts::PromptsConfig;
use super::settings::AssetsConfig;
use crate::errors::{QrqcError, Result};
use crate::report::ReportTemplate;

const FETCH_TIMEOUT_SECS: u64 = 15;

/// Immutable documents the engine and renderer work from
#[derive(Debug, Clone)]
pub struct Assets {
    pub prompts: PromptsConfig,
    pub template: ReportTemplate,
}

/// Lazily fetches [`Assets`] on first use and hands out the cached copy after
pub struct AssetLoader {
    client: Client,
    sources: AssetsConfig,
    cell: OnceCell<Arc<Assets>>,
}

impl AssetLoader {
    pub fn new(sources: AssetsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| QrqcError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            sources,
            cell: OnceCell::new(),
        })
    }

    /// Fetch both documents, or return the copy fetched earlier
    pub async fn get(&self) -> Result<Arc<Assets>> {
        self.cell
            .get_or_try_init(|| async {
                let prompts: PromptsConfig =
                    fetch_document(&self.client, &self.sources.prompts_url).await?;
                let template: ReportTemplate =
                    fetch_document(&self.client, &self.sources.template_url).await?;

                tracing::info!(
                    "Loaded prompts from {} and a {}-element report template from {}",
                    self.sources.prompts_url,
                    template.len(),
                    self.sources.template_url
                );

                Ok::<_, QrqcError>(Arc::new(Assets { prompts, template }))
            })
            .await
            .cloned()
    }
}

/// Read one JSON document from an http(s) URL or a local path
pub async fn fetch_document<T: DeserializeOwned>(client: &Client, source: &str) -> Result<T> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = client
            .get(source)
            .send()
            .await
            .map_err(|e| QrqcError::Config(format!("could not fetch {}: {}", source, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QrqcError::Config(format!(
                "could not fetch {}: HTTP {}",
                source, status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| QrqcError::Config(format!("invalid JSON at {}: {}", source, e)))
    } else {
        let path = Path::new(source.strip_prefix("file://").unwrap_or(source));
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            QrqcError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| QrqcError::Config(format!("invalid JSON in {}: {}", path.display(), e)))
    }
}
