use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use s3rotate_core::Prefix;

use crate::config::AppConfig;
use crate::progress;

#[derive(Args)]
pub struct UploadArgs {
    /// Local directory to upload from
    local_dir: PathBuf,

    /// Bucket directory to upload into
    dir: Prefix,

    /// Descend into local subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: UploadArgs, config_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let transfer = config.open_transfer()?;

    let spinner = progress::create_spinner(&format!(
        "Uploading {} to {}...",
        args.local_dir.display(),
        args.dir
    ));
    let report = if args.recursive {
        transfer.upload_tree(&args.dir, &args.local_dir).await
    } else {
        transfer.upload_flat(&args.dir, &args.local_dir).await
    };
    spinner.finish_and_clear();

    super::finish(&report?, "Uploaded", args.json)
}
