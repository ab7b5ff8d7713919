use std::path::Path;

use anyhow::Result;
use clap::Args;

use s3rotate_core::Prefix;

use crate::config::AppConfig;

#[derive(Args)]
pub struct LsArgs {
    /// Directory to list (default: every key in the bucket)
    dir: Option<Prefix>,

    /// Include files of nested directories
    #[arg(short, long)]
    recursive: bool,
}

pub async fn run(args: LsArgs, config_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let transfer = config.open_transfer()?;
    let tree = transfer.tree();

    let entries = match &args.dir {
        None => tree.list_all_keys().await?,
        Some(dir) if args.recursive => tree.list_all_descendants(dir).await?,
        Some(dir) => tree.list_immediate_children(dir).await?,
    };

    if entries.is_empty() {
        println!("No objects found.");
        return Ok(());
    }
    for entry in &entries {
        println!("{entry}");
    }
    Ok(())
}
