//! Command-line interface for ADFX.
//!
//! A thin driver over [`Analysis`]: every command loads one template file,
//! runs the analysis with the effective [`AnalysisConfig`], and renders the
//! result.
//!
//! # Commands
//!
//! - `inspect <TEMPLATE>` - colored summary of resources, edges and warnings
//! - `dump <TEMPLATE>` - the resolved model as JSON on stdout
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging on stderr
//! - `--quiet` / `-q` - no logging at all
//! - `--config` / `-c` - path to an analysis configuration file
//!
//! Without `--verbose` or `--quiet`, `RUST_LOG` is honoured and defaults to
//! errors only.
//!
//! # Exit Codes
//!
//! - `0` - success
//! - `1` - the template could not be read or analyzed
//! - `2` - `--deny-warnings` was given and warnings were recorded

mod dump;
mod inspect;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::analysis::Analysis;
use crate::config::AnalysisConfig;
use crate::template::Template;

pub use dump::DumpCommand;
pub use inspect::InspectCommand;

/// Returned when `--deny-warnings` is set and the analysis recorded warnings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{count} warning(s) recorded and --deny-warnings is set")]
pub struct WarningsDenied {
    pub count: usize,
}

/// Main CLI structure for ADFX.
#[derive(Parser)]
#[command(
    name = "adfx",
    about = "Inspect Azure Data Factory ARM templates",
    version,
    long_about = "ADFX resolves the resources, activities and dependencies declared in an \
                  exported Azure Data Factory ARM template without deploying or running anything."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable all logging
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to an analysis configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a template
    Inspect(InspectCommand),

    /// Print the resolved model of a template as JSON
    Dump(DumpCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let config = AnalysisConfig::load_with_optional(self.config.clone()).await?;
        tracing::debug!("Effective configuration: {config:?}");

        match self.command {
            Commands::Inspect(cmd) => cmd.execute(&config).await,
            Commands::Dump(cmd) => cmd.execute(&config).await,
        }
    }

    /// Log filter implied by the global flags.
    fn log_filter(&self) -> EnvFilter {
        if self.verbose {
            EnvFilter::new("debug")
        } else if self.quiet {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
        }
    }

    fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(self.verbose)
            .try_init();
    }
}

/// Load a template and analyze it.
pub(crate) async fn analyze(path: &Path, config: &AnalysisConfig) -> Result<Analysis> {
    let template = Template::load(path).await?;
    Ok(Analysis::run(&template, config))
}

/// Fail with [`WarningsDenied`] when requested and warnings exist.
pub(crate) fn check_warnings(analysis: &Analysis, deny_warnings: bool) -> Result<()> {
    if deny_warnings && analysis.has_warnings() {
        return Err(WarningsDenied {
            count: analysis.warnings.len(),
        }
        .into());
    }
    Ok(())
}
