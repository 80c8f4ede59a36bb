//! CadForge CLI
//!
//! Presentation adapter for the upload/processing pipeline: uploads CAD
//! files, waits for the security scan, optionally runs a processing action,
//! and writes ready artifacts to disk.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::error;

#[derive(Parser)]
#[command(name = "cadforge")]
#[command(author, version, about = "CadForge - upload, scan, and process CAD files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files, run the security scan, and optionally process them
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Extract contours once the scan settles
        #[arg(long)]
        contour: bool,

        /// Convert to a target format (pdf, svg, png)
        #[arg(long, conflicts_with = "contour")]
        convert: Option<String>,

        /// Directory for ready artifacts
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
    },

    /// Validate a file against the upload policy without uploading it
    Check {
        /// File to check
        file: PathBuf,
    },

    /// List supported conversion formats
    Formats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "cadforge_cli=debug,cadforge_core=debug,cadforge_services=debug"
        } else {
            "cadforge_cli=info,cadforge_core=warn,cadforge_services=warn"
        })
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let result = match cli.command {
        Commands::Upload {
            files,
            contour,
            convert,
            out,
        } => commands::upload::run(files, contour, convert, out).await,
        Commands::Check { file } => commands::check::run(&file),
        Commands::Formats => commands::formats::run(),
    };

    if let Err(ref e) = result {
        error!("Command failed: {}", e);
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}
