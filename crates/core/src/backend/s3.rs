use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use tracing::{debug, info};

use super::Backend;
use crate::transfer::TransferConfig;

pub struct S3Backend {
    bucket: Box<Bucket>,
}

impl S3Backend {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        path_style: bool,
    ) -> Result<Self> {
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: endpoint.to_string(),
        };
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)?;
        let mut bucket = Bucket::new(bucket_name, region, credentials)
            .with_context(|| format!("invalid S3 bucket configuration: {bucket_name}"))?;
        if path_style {
            bucket = bucket.with_path_style();
        }
        info!(bucket = %bucket_name, endpoint = %endpoint, "Connected to bucket");
        Ok(Self { bucket })
    }
}

#[async_trait]
impl Backend for S3Backend {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        // `Bucket::list` keeps requesting pages until the continuation
        // token runs out.
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .with_context(|| format!("S3 LIST failed: {prefix}"))?;
        debug!(prefix = %prefix, pages = pages.len(), "Listed bucket");
        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|obj| obj.key)
            .collect())
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.bucket
            .put_object(key, data)
            .await
            .with_context(|| format!("S3 PUT failed: {key}"))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.bucket
            .delete_object(key)
            .await
            .with_context(|| format!("S3 DELETE failed: {key}"))?;
        Ok(())
    }

    async fn upload_file(&self, key: &str, path: &Path, config: &TransferConfig) -> Result<()> {
        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat: {}", path.display()))?
            .len();
        if size < config.multipart_threshold {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read: {}", path.display()))?;
            return self.put(key, &data).await;
        }

        debug!(key = %key, size, "Using multipart upload");
        let mut file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open: {}", path.display()))?;
        self.bucket
            .put_object_stream(&mut file, key)
            .await
            .with_context(|| format!("S3 multipart PUT failed: {key}"))?;
        Ok(())
    }
}
