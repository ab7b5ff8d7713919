use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use s3rotate_core::backend::Backend;
use s3rotate_core::backend::local::LocalBackend;
use s3rotate_core::backend::retry::RetryBackend;
use s3rotate_core::backend::s3::S3Backend;
use s3rotate_core::{Transfer, TransferConfig};

const CONFIG_FILE: &str = "s3rotate.toml";
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub transfer: TransferSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    #[serde(rename = "local")]
    Local { path: String },
    #[serde(rename = "s3")]
    S3 {
        endpoint: String,
        region: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        #[serde(default = "default_path_style")]
        path_style: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSection {
    #[serde(flatten)]
    pub transfer: TransferConfig,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            transfer: TransferConfig::default(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

fn default_path_style() -> bool {
    true
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("s3rotate")
            .join(CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("config not found at {}", path.display()))?;
        toml::from_str(&content).context("failed to parse config")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn open_backend(&self) -> Result<Arc<dyn Backend>> {
        let backend: Arc<dyn Backend> = match &self.storage {
            StorageConfig::Local { path } => Arc::new(LocalBackend::new(path)?),
            StorageConfig::S3 {
                endpoint,
                region,
                bucket,
                access_key,
                secret_key,
                path_style,
            } => Arc::new(S3Backend::new(
                bucket,
                endpoint,
                region,
                access_key,
                secret_key,
                *path_style,
            )?),
        };
        if self.transfer.max_retries == 0 {
            return Ok(backend);
        }
        Ok(Arc::new(RetryBackend::new(
            backend,
            self.transfer.max_retries,
        )))
    }

    pub fn open_transfer(&self) -> Result<Transfer> {
        Ok(Transfer::new(
            self.open_backend()?,
            self.transfer.transfer.clone(),
        ))
    }
}
