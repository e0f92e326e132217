//! Global constants used throughout the ADFX codebase.
//!
//! ARM type strings, ADF activity type names and the defaults that the
//! configuration layer falls back to. Keeping them in one place makes the
//! handful of magic strings the analyzer depends on easy to audit.

/// ARM provider prefix shared by every Data Factory child resource.
pub const FACTORY_TYPE_PREFIX: &str = "Microsoft.DataFactory/factories";

/// Parameter whose default value names the factory in exported templates.
pub const DEFAULT_FACTORY_PARAMETER: &str = "factoryName";

/// Prefix used for runtime-only placeholders, rendered as `<runtime:NAME>`.
pub const DEFAULT_RUNTIME_PREFIX: &str = "runtime";

/// Environment variable that points at an alternative configuration file.
pub const CONFIG_ENV_VAR: &str = "ADFX_CONFIG";

/// Location used when the template declares no location parameter.
pub const DEFAULT_LOCATION: &str = "northeurope";

/// Maximum nesting of `parameters()`/`variables()` indirections followed
/// while resolving a single expression.
pub const MAX_REFERENCE_DEPTH: usize = 32;

/// Maximum Levenshtein distance, as a percentage of the target length, for
/// a catalog name to be offered as a "did you mean" suggestion.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

// Activity types with special handling

/// Activity that invokes another pipeline.
pub const EXECUTE_PIPELINE: &str = "ExecutePipeline";
/// Copy activity (source/sink metadata).
pub const COPY: &str = "Copy";
/// Databricks notebook activity (notebook path metadata).
pub const DATABRICKS_NOTEBOOK: &str = "DatabricksNotebook";
/// Loop over a collection; body in `typeProperties.activities`.
pub const FOR_EACH: &str = "ForEach";
/// Loop until a condition holds; body in `typeProperties.activities`.
pub const UNTIL: &str = "Until";
/// Conditional with `ifTrueActivities` / `ifFalseActivities`.
pub const IF_CONDITION: &str = "IfCondition";
/// Multi-way branch with `cases[].activities` and `defaultActivities`.
pub const SWITCH: &str = "Switch";

/// Trigger type that carries its schedule directly in `typeProperties`.
pub const TUMBLING_WINDOW_TRIGGER: &str = "TumblingWindowTrigger";
