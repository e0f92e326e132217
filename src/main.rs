//! ADFX CLI entry point
//!
//! Parses the command line, runs the selected command and maps failures to
//! exit codes:
//! - `inspect` - summary of a template's resources, dependencies and warnings
//! - `dump` - the resolved model as JSON

use adfx_cli::cli::{self, WarningsDenied};
use adfx_cli::core::user_friendly_error;
use anyhow::Result;
use clap::Parser;
use colored::Colorize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(denied) = e.downcast_ref::<WarningsDenied>() {
                eprintln!("{}: {denied}", "error".red().bold());
                std::process::exit(2);
            }
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
