// Optional persistence of finished reports
//
// Storage is fire-and-forget: the PDF is already on disk for the user when
// the upload starts, and a storage failure is only logged.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::errors::{QrqcError, Result};

const STORE_ACTION: &str = "store_report";
const STORE_TIMEOUT_SECS: u64 = 60;

/// A rendered report and the metadata stored with it
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub file_name: String,
    pub problem_statement: String,
    pub content: Vec<u8>,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn store(&self, report: &StoredReport) -> Result<()>;

    fn name(&self) -> &str;
}

/// Uploads through the relay's `store_report` action
pub struct ProxyReportStore {
    client: Client,
    url: String,
    nonce: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoreEnvelope {
    success: bool,
    #[serde(default)]
    data: Value,
}

impl ProxyReportStore {
    pub fn new(url: String, nonce: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(STORE_TIMEOUT_SECS))
            .build()
            .map_err(|e| QrqcError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, url, nonce })
    }
}

#[async_trait]
impl ReportStore for ProxyReportStore {
    async fn store(&self, report: &StoredReport) -> Result<()> {
        let encoded = STANDARD.encode(&report.content);
        let mut form: Vec<(&str, &str)> = vec![
            ("action", STORE_ACTION),
            ("report_content", encoded.as_str()),
            ("file_name", report.file_name.as_str()),
            ("problem_statement", report.problem_statement.as_str()),
        ];
        if let Some(nonce) = &self.nonce {
            form.push(("nonce", nonce.as_str()));
        }

        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| QrqcError::Persistence(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QrqcError::Persistence(e.to_string()))?;

        if !status.is_success() {
            return Err(QrqcError::Persistence(format!("HTTP {}", status)));
        }

        match serde_json::from_str::<StoreEnvelope>(&body) {
            Ok(envelope) if envelope.success => Ok(()),
            Ok(envelope) => Err(QrqcError::Persistence(match envelope.data {
                Value::String(message) => message,
                other => other.to_string(),
            })),
            Err(_) => Err(QrqcError::Persistence(
                "store endpoint answered with a non-JSON body".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "proxy"
    }
}

/// Keeps a copy of every report in a local folder, with a JSON sidecar
pub struct DirectoryReportStore {
    directory: PathBuf,
}

#[derive(Debug, Serialize)]
struct ReportMetadata<'a> {
    file_name: &'a str,
    problem_statement: &'a str,
    stored_at: String,
    size_bytes: usize,
}

impl DirectoryReportStore {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ReportStore for DirectoryReportStore {
    async fn store(&self, report: &StoredReport) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| QrqcError::Persistence(format!("{}: {}", self.directory.display(), e)))?;

        let path = self.directory.join(&report.file_name);
        tokio::fs::write(&path, &report.content)
            .await
            .map_err(|e| QrqcError::Persistence(format!("{}: {}", path.display(), e)))?;

        let metadata = ReportMetadata {
            file_name: &report.file_name,
            problem_statement: &report.problem_statement,
            stored_at: chrono::Utc::now().to_rfc3339(),
            size_bytes: report.content.len(),
        };
        let sidecar = path.with_extension("json");
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| QrqcError::Persistence(e.to_string()))?;
        tokio::fs::write(&sidecar, json)
            .await
            .map_err(|e| QrqcError::Persistence(format!("{}: {}", sidecar.display(), e)))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// Store selected by `[store]`, if any; the proxy upload wins over the folder
pub fn create_store(config: &Config) -> Result<Option<Arc<dyn ReportStore>>> {
    if let Some(url) = &config.store.proxy_url {
        let store = ProxyReportStore::new(url.clone(), config.transport.nonce.clone())?;
        return Ok(Some(Arc::new(store)));
    }
    if let Some(directory) = &config.store.directory {
        return Ok(Some(Arc::new(DirectoryReportStore::new(directory.clone()))));
    }
    Ok(None)
}

/// Store in the background; the outcome is only logged
pub fn spawn_store(store: Arc<dyn ReportStore>, report: StoredReport) -> JoinHandle<()> {
    tokio::spawn(async move {
        match store.store(&report).await {
            Ok(()) => tracing::info!("Stored report {} via {}", report.file_name, store.name()),
            Err(e) => tracing::warn!(
                "Could not store report {} via {}: {}",
                report.file_name,
                store.name(),
                e
            ),
        }
    })
}
