use std::path::Path;

use anyhow::Result;
use clap::Args;

use s3rotate_core::Prefix;

use crate::config::AppConfig;
use crate::progress;

#[derive(Args)]
pub struct RmArgs {
    /// Bucket directory whose files are deleted
    dir: Prefix,

    /// Also delete everything in nested directories
    #[arg(short, long)]
    recursive: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: RmArgs, config_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let transfer = config.open_transfer()?;

    let scope = if args.recursive {
        "all files below"
    } else {
        "the files directly in"
    };
    if !super::confirm(&format!("Delete {scope} {}?", args.dir), args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let spinner = progress::create_spinner(&format!("Deleting from {}...", args.dir));
    let report = if args.recursive {
        transfer.delete_all_under_directory(&args.dir).await
    } else {
        transfer.delete_immediate_children_only(&args.dir).await
    };
    spinner.finish_and_clear();

    super::finish(&report?, "Deleted", args.json)
}
