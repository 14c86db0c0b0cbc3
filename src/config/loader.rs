// Configuration loader
// Loads settings from ~/.qrqc/config.toml (or $QRQC_CONFIG) with environment fallbacks

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;
use crate::errors::wrap_error_with_suggestion;

const CONFIG_PATH_ENV: &str = "QRQC_CONFIG";
const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Load configuration from the config file or environment
pub fn load_config() -> Result<Config> {
    let path = default_config_path()?;

    if let Some(config) = try_load_from_file(&path)? {
        return Ok(config);
    }

    // Fall back to environment variable
    if let Ok(api_key) = std::env::var(API_KEY_ENV) {
        if !api_key.is_empty() {
            let mut config = Config::default();
            config.transport.api_key = Some(api_key);
            config
                .validate()
                .context("Configuration validation failed")?;
            return Ok(config);
        }
    }

    bail!(wrap_error_with_suggestion(
        format!("No configuration found at {}", path.display()),
        "Create it with at least:\n\n  \
         [transport]\n  \
         api_key = \"...\"\n\n  \
         [assets]\n  \
         prompts_url = \"https://example.org/.../qrqc_config.json\"\n  \
         template_url = \"https://example.org/.../qrqc_report_template.json\"\n\n\
         Alternatively, set environment variable:\n  \
         export GEMINI_API_KEY=\"...\""
    ));
}

/// Load configuration from an explicit file
pub fn load_config_from(path: &Path) -> Result<Config> {
    match try_load_from_file(path)? {
        Some(config) => Ok(config),
        None => bail!("Configuration file not found: {}", path.display()),
    }
}

fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".qrqc").join("config.toml"))
}

fn try_load_from_file(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

    let mut config: Config = toml::from_str(&contents).map_err(|e| {
        anyhow::anyhow!(wrap_error_with_suggestion(
            format!("Failed to parse {}: {}", path.display(), e),
            "Check the TOML syntax and section names ([transport], [assets], [output], [store], [quota])"
        ))
    })?;

    // An API key in the environment fills in a config file that leaves it out
    if config.transport.api_key.is_none() {
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            if !api_key.is_empty() {
                config.transport.api_key = Some(api_key);
            }
        }
    }

    config
        .validate()
        .context("Configuration validation failed")?;

    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(Some(config))
}
