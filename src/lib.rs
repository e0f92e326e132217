//! ADFX - Azure Data Factory template inspector
//!
//! Reads an exported Azure Data Factory ARM template and builds a resolved,
//! queryable model of the factory it describes, without deploying or
//! executing anything.
//!
//! # Architecture Overview
//!
//! An analysis runs in four stages, each feeding the next:
//!
//! 1. [`expression`] - resolves ARM template expressions
//!    (`[concat(parameters('factoryName'), '/PL_Load')]`) against the
//!    template's parameters and variables. Values only known when a pipeline
//!    runs (`@pipeline().parameters.x`) become `<runtime:x>` placeholders.
//! 2. [`catalog`] - classifies every resource by kind, strips the factory
//!    prefix from its name and extracts kind-specific details.
//! 3. [`activity`] - flattens each pipeline's nested activities
//!    (`ForEach`, `Until`, `IfCondition`, `Switch`) into one list that keeps
//!    parent, branch and depth.
//! 4. [`graph`] - derives typed dependency edges between pipelines,
//!    activities, datasets, linked services, integration runtimes and
//!    triggers.
//!
//! [`analysis::Analysis`] drives all four stages. Malformed input never
//! aborts a run: problems are recorded as [`core::Warning`]s and the rest of
//! the template is still analyzed. Only a template whose top-level structure
//! cannot be walked is an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use adfx_cli::analysis::Analysis;
//! use adfx_cli::config::AnalysisConfig;
//! use adfx_cli::core::{EdgeKind, EntityId};
//! use adfx_cli::template::Template;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let template = Template::load("ARMTemplateForFactory.json".as_ref()).await?;
//! let analysis = Analysis::run(&template, &AnalysisConfig::default());
//!
//! for edge in analysis.graph.outgoing(&EntityId::pipeline("PL_Master"), Some(EdgeKind::PipelineCallsPipeline)) {
//!     println!("PL_Master calls {}", edge.target);
//! }
//! for warning in &analysis.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Summary with the call tree below one pipeline
//! adfx inspect ARMTemplateForFactory.json --tree PL_Master
//!
//! # Full model as JSON, failing on warnings (exit code 2)
//! adfx dump ARMTemplateForFactory.json --pretty --deny-warnings
//! ```

// Analysis stages
pub mod activity;
pub mod analysis;
pub mod catalog;
pub mod expression;
pub mod graph;
pub mod template;

// Core types and shared modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
