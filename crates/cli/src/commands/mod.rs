pub mod init;
pub mod ls;
pub mod prune;
pub mod rm;
pub mod upload;

use anyhow::Result;
use clap::Subcommand;
use console::style;
use dialoguer::Confirm;

use s3rotate_core::BatchReport;

#[derive(Subcommand)]
pub enum Command {
    /// Write a config file for a bucket or a local directory
    Init(init::InitArgs),
    /// List keys in the bucket or in one directory
    Ls(ls::LsArgs),
    /// Upload the files of a local directory
    Upload(upload::UploadArgs),
    /// Delete the files of a directory
    Rm(rm::RmArgs),
    /// Delete backups that the monthly retention policy no longer needs
    Prune(prune::PruneArgs),
}

/// Ask before a destructive step unless `--yes` was given.
fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Print the outcome of a bulk operation; fails if any key failed.
fn finish(report: &BatchReport, verb: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!(
            "{} {} of {} objects",
            style(verb).green(),
            report.succeeded.len(),
            report.total()
        );
        for failure in &report.failed {
            println!("  {} {}: {}", style("failed").red(), failure.key, failure.error);
        }
    }
    if !report.is_ok() {
        anyhow::bail!("{} of {} objects failed", report.failed.len(), report.total());
    }
    Ok(())
}
