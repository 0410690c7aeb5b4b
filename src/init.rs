//! init command: Create config.json template
//!
//! Writes a configuration file with every key present and sensible defaults.

use crate::config::Config;
use anyhow::{bail, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Output file path (default: config.json)
    #[arg(short, long, default_value = "config.json")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub created: String,
    pub file: String,
}

pub async fn run_init(args: InitArgs) -> Result<()> {
    // Check if file exists
    if args.output.exists() && !args.force {
        let error = serde_json::json!({
            "error": "file_exists",
            "message": format!(
                "{} already exists. Use --force to overwrite.",
                args.output.display()
            ),
            "file": args.output.display().to_string()
        });
        println!("{}", serde_json::to_string(&error)?);
        bail!("File exists");
    }

    let json = serde_json::to_string_pretty(&Config::template())?;
    tokio::fs::write(&args.output, format!("{}\n", json)).await?;

    let output = InitOutput {
        created: Utc::now().to_rfc3339(),
        file: args.output.display().to_string(),
    };
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}
