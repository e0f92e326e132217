//! `adfx dump`: the resolved model as JSON.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::AnalysisConfig;

#[derive(Args, Debug)]
pub struct DumpCommand {
    /// ARM template file to analyze
    pub template: PathBuf,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,

    /// Exit with status 2 when warnings were recorded
    #[arg(long)]
    pub deny_warnings: bool,
}

impl DumpCommand {
    pub async fn execute(self, config: &AnalysisConfig) -> Result<()> {
        let analysis = super::analyze(&self.template, config).await?;

        let json = if self.pretty {
            serde_json::to_string_pretty(&analysis)
        } else {
            serde_json::to_string(&analysis)
        }
        .context("Failed to serialize analysis")?;
        println!("{json}");

        super::check_warnings(&analysis, self.deny_warnings)
    }
}
