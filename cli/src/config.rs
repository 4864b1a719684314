use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use platelog_core::store::DEFAULT_TABLE;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// On-disk settings. Every field can be overridden from the environment.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    store_url: Option<String>,
    api_key: Option<String>,
    table: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub timeout: Duration,
}

pub struct Config {
    pub config_path: PathBuf,
    store: Option<StoreConfig>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "platelog").context("Could not determine home directory")?;
        let config_path = proj_dirs.config_dir().join("config.json");
        Self::load_from(&config_path, |key| std::env::var(key).ok())
    }

    fn load_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str::<ConfigFile>(&raw)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        } else {
            ConfigFile::default()
        };

        let non_blank = |v: String| {
            let v = v.trim().to_string();
            (!v.is_empty()).then_some(v)
        };

        let base_url = env("PLATELOG_STORE_URL")
            .and_then(non_blank)
            .or(file.store_url.and_then(non_blank));
        let api_key = env("PLATELOG_STORE_KEY")
            .and_then(non_blank)
            .or(file.api_key.and_then(non_blank));
        let table = env("PLATELOG_STORE_TABLE")
            .and_then(non_blank)
            .or(file.table.and_then(non_blank))
            .unwrap_or_else(|| DEFAULT_TABLE.to_string());
        let timeout_secs = match env("PLATELOG_STORE_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid PLATELOG_STORE_TIMEOUT_SECS '{v}'"))?,
            None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        let store = match (base_url, api_key) {
            (Some(base_url), Some(api_key)) => Some(StoreConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
                table,
                timeout: Duration::from_secs(timeout_secs.max(1)),
            }),
            (None, None) => None,
            (Some(_), None) => bail!("Meal store URL is set but no API key (PLATELOG_STORE_KEY)"),
            (None, Some(_)) => bail!("Meal store API key is set but no URL (PLATELOG_STORE_URL)"),
        };

        Ok(Config {
            config_path: path.to_path_buf(),
            store,
        })
    }

    /// Remote store settings, required by every command that talks to the store.
    pub fn store(&self) -> Result<&StoreConfig> {
        match &self.store {
            Some(store) => Ok(store),
            None => bail!(
                "No meal store configured. Set PLATELOG_STORE_URL and PLATELOG_STORE_KEY, or add \
                 store_url and api_key to {}",
                self.config_path.display()
            ),
        }
    }
}
