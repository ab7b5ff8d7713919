use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use console::style;

use s3rotate_core::{Prefix, RetentionAnchor};

use crate::config::AppConfig;
use crate::progress;

#[derive(Args)]
pub struct PruneArgs {
    /// Bucket directory holding dated backups
    dir: Prefix,

    /// Only show what would be deleted
    #[arg(long)]
    dry_run: bool,

    /// Evaluate the policy as of this date instead of today (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: PruneArgs, config_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let transfer = config.open_transfer()?;
    let anchor = args
        .today
        .map(RetentionAnchor::from_date)
        .unwrap_or_else(RetentionAnchor::now);

    let spinner = progress::create_spinner(&format!("Evaluating backups in {}...", args.dir));
    let plan = transfer.plan_prune(&args.dir, &anchor).await;
    spinner.finish_and_clear();
    let plan = plan?;

    if args.dry_run {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }
        println!("Files before {} are kept once per month and database.", plan.boundary);
        for name in &plan.keep {
            println!("  {} {name}", style("keep  ").green());
        }
        for name in &plan.delete {
            println!("  {} {name}", style("delete").red());
        }
        return Ok(());
    }

    if plan.delete.is_empty() {
        println!("Nothing to prune in {}.", args.dir);
        return Ok(());
    }
    let prompt = format!(
        "Delete {} of {} files in {}?",
        plan.delete.len(),
        plan.delete.len() + plan.keep.len(),
        args.dir
    );
    if !super::confirm(&prompt, args.yes)? {
        println!("Aborted.");
        return Ok(());
    }

    let spinner = progress::create_spinner(&format!("Pruning {}...", args.dir));
    let report = transfer.execute_plan(&args.dir, plan).await;
    spinner.finish_and_clear();

    super::finish(&report, "Deleted", args.json)
}
