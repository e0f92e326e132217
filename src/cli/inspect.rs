//! `adfx inspect`: human-readable summary of a template.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::analysis::Analysis;
use crate::config::AnalysisConfig;
use crate::core::{EdgeKind, EntityId, ResourceKind};

#[derive(Args, Debug)]
pub struct InspectCommand {
    /// ARM template file to analyze
    pub template: PathBuf,

    /// Also print the call tree below this pipeline
    ///
    /// Follows `ExecutePipeline` edges from the named pipeline. Pipelines
    /// already on the current path are marked `(cycle)` and pipelines that
    /// are not declared in the template are marked `(unresolved)`.
    #[arg(long, value_name = "PIPELINE")]
    pub tree: Option<String>,

    /// Exit with status 2 when warnings were recorded
    #[arg(long)]
    pub deny_warnings: bool,
}

impl InspectCommand {
    pub async fn execute(self, config: &AnalysisConfig) -> Result<()> {
        let analysis = super::analyze(&self.template, config).await?;
        print!("{}", render_summary(&analysis, self.tree.as_deref()));
        super::check_warnings(&analysis, self.deny_warnings)
    }
}

fn render_summary(analysis: &Analysis, tree: Option<&str>) -> String {
    let mut out = String::new();

    let factory = analysis.factory.name.as_deref().unwrap_or("<unnamed factory>");
    let _ = writeln!(out, "{} {} ({})", "Factory:".bold(), factory.cyan(), analysis.factory.location);
    if let Some(version) = &analysis.factory.content_version {
        let _ = writeln!(out, "  content version {version}");
    }
    if !analysis.global_parameters.is_empty() {
        let _ = writeln!(out, "  {} global parameter(s)", analysis.global_parameters.len());
    }

    let _ = writeln!(out, "\n{}", "Resources:".bold());
    for kind in ResourceKind::ALL {
        let count = analysis.catalog.count(kind);
        if count > 0 {
            let _ = writeln!(out, "  {count:>4} {}", kind.plural());
        }
    }
    let activity_total: usize = analysis.activities.iter().map(|p| p.activities.len()).sum();
    let _ = writeln!(out, "  {activity_total:>4} activities");

    let _ = writeln!(out, "\n{}", "Dependencies:".bold());
    for kind in EdgeKind::ALL {
        let edges = analysis.graph.edges_of_kind(kind);
        if edges.is_empty() {
            continue;
        }
        let unresolved = edges.iter().filter(|e| !e.resolved).count();
        if unresolved > 0 {
            let _ = writeln!(
                out,
                "  {:>4} {kind} {}",
                edges.len(),
                format!("({unresolved} unresolved)").yellow()
            );
        } else {
            let _ = writeln!(out, "  {:>4} {kind}", edges.len());
        }
    }

    if let Some(root) = tree {
        let _ = writeln!(out, "\n{}", "Call tree:".bold());
        let rendered = analysis
            .graph
            .to_tree_string(&EntityId::pipeline(root), EdgeKind::PipelineCallsPipeline);
        for line in rendered.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }

    if analysis.warnings.is_empty() {
        let _ = writeln!(out, "\n{}", "No warnings".green());
    } else {
        let _ = writeln!(out, "\n{}", format!("Warnings ({}):", analysis.warnings.len()).yellow().bold());
        for warning in &analysis.warnings {
            let _ = writeln!(out, "  {} {warning}", "⚠".yellow());
        }
    }

    out
}
