//! Check command: validate a file against the upload policy

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use cadforge_core::{validate, ForgeConfig};

pub fn run(file: &Path) -> Result<()> {
    let config = ForgeConfig::load_from_directory(&std::env::current_dir()?)?;

    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", file.display()))?;
    let size = std::fs::metadata(file)
        .with_context(|| format!("Cannot read {}", file.display()))?
        .len();

    match validate::validate_upload(name, size, &config) {
        Ok(()) => {
            println!(
                "{} {} ({})",
                "OK".green().bold(),
                name,
                validate::format_size(size)
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "Rejected:".red().bold(), e.notification());
            Err(e.into())
        }
    }
}
