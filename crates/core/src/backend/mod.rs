pub mod local;
pub mod memory;
pub mod retry;
pub mod s3;

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::transfer::TransferConfig;

/// Flat key/value object storage.
///
/// Every method acts on exactly one key (or one listing), so callers can
/// retry or parallelize per key without coordinating with each other.
#[async_trait]
pub trait Backend: Send + Sync {
    /// All keys starting with `prefix` (`""` lists everything), following
    /// continuation pages to the end.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    /// Store the content of a local file. Backends with a multipart path
    /// switch to it once the file reaches `config.multipart_threshold`.
    async fn upload_file(&self, key: &str, path: &Path, _config: &TransferConfig) -> Result<()> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read: {}", path.display()))?;
        self.put(key, &data).await
    }
}
