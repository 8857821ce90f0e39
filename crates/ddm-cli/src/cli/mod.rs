//! CLI for the DDM download manager.

mod commands;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ddm_core::config;
use std::path::PathBuf;

use commands::{run_download, run_info};

/// Top-level CLI for the DDM download manager.
#[derive(Debug, Parser)]
#[command(name = "ddm")]
#[command(about = "DDM: segmented, resumable HTTP download manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a file, resuming an interrupted transfer if one is found.
    Download {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Save to this exact path instead of deriving a name from the URL.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Save into this directory, keeping the server-provided filename.
        #[arg(short = 'd', long, value_name = "DIR", conflicts_with = "output")]
        dir: Option<PathBuf>,

        /// Number of segments to split the download into (default: config value).
        #[arg(short, long, value_name = "N")]
        segments: Option<usize>,

        /// Ignore any existing `.part`/`.state` pair and start over.
        #[arg(long)]
        no_resume: bool,
    },

    /// Probe a URL and print what the server reports, without downloading.
    Info {
        /// Direct HTTP/HTTPS URL to inspect.
        url: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!(?cfg, "loaded config");

        match cli.command {
            CliCommand::Download {
                url,
                output,
                dir,
                segments,
                no_resume,
            } => run_download(cfg, &url, output, dir, segments, !no_resume).await?,
            CliCommand::Info { url } => run_info(cfg, &url).await?,
        }

        Ok(())
    }
}
