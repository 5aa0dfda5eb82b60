mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "famsync")]
#[command(about = "Keep family member calendars in sync with shared parent calendars")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass over every configured child calendar
    Sync {
        /// Config file (defaults to ~/.config/famsync/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Log progress for every child
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show pending changes for every child calendar
    Status {
        /// Config file (defaults to ~/.config/famsync/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// List every event instead of counts
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            config,
            dry_run,
            verbose,
        } => {
            init_logging(verbose);
            let loaded = commands::load(config)?;
            if dry_run {
                commands::status::run(loaded, verbose).await
            } else {
                commands::sync::run(loaded, verbose).await
            }
        }
        Commands::Status { config, verbose } => {
            init_logging(false);
            let loaded = commands::load(config)?;
            commands::status::run(loaded, verbose).await
        }
    }
}

/// `RUST_LOG` wins; otherwise only warnings, or famsync's own info logs with `-v`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,famsync_core=info,famsync_cli=info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
