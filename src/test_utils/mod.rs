//! Test utilities for ADFX
//!
//! Helpers shared by unit tests and the integration suite: one-time logging
//! setup and builders for exported factory templates.
//!
//! # Example
//!
//! ```rust,no_run
//! use adfx_cli::analysis::Analysis;
//! use adfx_cli::config::AnalysisConfig;
//! use adfx_cli::test_utils::fixtures::{TemplateBuilder, copy_activity};
//!
//! let template = TemplateBuilder::new("MyFactory")
//!     .linked_service("LS_Sql", "AzureSqlDatabase", None)
//!     .dataset("D1", "AzureSqlTable", "LS_Sql")
//!     .dataset("D2", "Parquet", "LS_Sql")
//!     .pipeline("B", vec![copy_activity("Copy", "D1", "D2")])
//!     .build();
//! let analysis = Analysis::from_value(template, &AnalysisConfig::default()).unwrap();
//! assert!(analysis.warnings.is_empty());
//! ```

pub mod fixtures;

pub use fixtures::TemplateBuilder;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `None`, logging is enabled only
/// when `RUST_LOG` is set.
///
/// ```bash
/// RUST_LOG=adfx_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
