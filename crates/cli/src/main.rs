mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "s3rotate",
    version,
    about = "Upload, list, delete and rotate backups in an S3 bucket"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);

    match cli.command {
        commands::Command::Init(args) => commands::init::run(args, &config_path).await,
        commands::Command::Ls(args) => commands::ls::run(args, &config_path).await,
        commands::Command::Upload(args) => commands::upload::run(args, &config_path).await,
        commands::Command::Rm(args) => commands::rm::run(args, &config_path).await,
        commands::Command::Prune(args) => commands::prune::run(args, &config_path).await,
    }
}
