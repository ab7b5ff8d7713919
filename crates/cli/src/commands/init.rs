use std::path::Path;

use anyhow::Result;
use clap::Args;
use tracing::info;

use s3rotate_core::TransferConfig;

use crate::config::{AppConfig, StorageConfig, TransferSection};

#[derive(Args)]
pub struct InitArgs {
    /// Backend type: s3 or local
    #[arg(long)]
    backend: String,

    /// Path for local backend
    #[arg(long)]
    path: Option<String>,

    /// S3 endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// S3 bucket name
    #[arg(long)]
    bucket: Option<String>,

    /// S3 region
    #[arg(long, default_value = "auto")]
    region: String,

    /// S3 access key
    #[arg(long)]
    access_key: Option<String>,

    /// S3 secret key
    #[arg(long)]
    secret_key: Option<String>,

    /// Address the bucket as a subdomain instead of a path
    #[arg(long)]
    virtual_host: bool,

    /// Size in bytes from which uploads switch to multipart
    #[arg(long)]
    multipart_threshold: Option<u64>,

    /// Number of objects transferred in parallel
    #[arg(long)]
    concurrency: Option<usize>,

    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: InitArgs, config_path: &Path) -> Result<()> {
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    let storage = match args.backend.as_str() {
        "local" => {
            let path = args
                .path
                .ok_or_else(|| anyhow::anyhow!("--path required for local backend"))?;
            StorageConfig::Local { path }
        }
        "s3" => {
            let endpoint = args
                .endpoint
                .ok_or_else(|| anyhow::anyhow!("--endpoint required for S3 backend"))?;
            let bucket = args
                .bucket
                .ok_or_else(|| anyhow::anyhow!("--bucket required for S3 backend"))?;
            let access_key = args
                .access_key
                .ok_or_else(|| anyhow::anyhow!("--access-key required for S3 backend"))?;
            let secret_key = args
                .secret_key
                .ok_or_else(|| anyhow::anyhow!("--secret-key required for S3 backend"))?;
            StorageConfig::S3 {
                endpoint,
                region: args.region,
                bucket,
                access_key,
                secret_key,
                path_style: !args.virtual_host,
            }
        }
        other => anyhow::bail!("unknown backend: {other} (supported: local, s3)"),
    };

    let defaults = TransferConfig::default();
    let config = AppConfig {
        storage,
        transfer: TransferSection {
            transfer: TransferConfig {
                multipart_threshold: args
                    .multipart_threshold
                    .unwrap_or(defaults.multipart_threshold),
                concurrency: args.concurrency.unwrap_or(defaults.concurrency),
            },
            ..TransferSection::default()
        },
    };

    // Fail early on a configuration the backend refuses.
    config.open_backend()?;
    config.save(config_path)?;

    info!(config_path = %config_path.display(), "Config saved");
    println!("Config: {}", config_path.display());
    Ok(())
}
