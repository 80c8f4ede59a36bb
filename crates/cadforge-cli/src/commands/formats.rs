//! Formats command: list supported conversion targets

use anyhow::Result;
use colored::Colorize;

use cadforge_core::TargetFormat;

pub fn run() -> Result<()> {
    println!("{}", "Supported conversion formats".bold());
    for format in TargetFormat::all() {
        println!("  {}", format);
    }
    Ok(())
}
