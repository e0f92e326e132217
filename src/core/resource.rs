//! Resource kinds for ADFX
//!
//! Every entry in an ARM template's `resources` array carries a `type` such as
//! `Microsoft.DataFactory/factories/pipelines`. ADFX collapses those strings
//! into a small closed set of [`ResourceKind`]s. Anything it does not know is
//! kept as [`ResourceKind::Other`] so no declared resource silently vanishes.
//!
//! # Examples
//!
//! ```rust
//! use adfx_cli::core::ResourceKind;
//!
//! let kind = ResourceKind::from_arm_type("Microsoft.DataFactory/factories/pipelines");
//! assert_eq!(kind, ResourceKind::Pipeline);
//!
//! let kind: ResourceKind = "Dataset".parse().unwrap();
//! assert_eq!(kind, ResourceKind::Dataset);
//! assert_eq!(kind.to_string(), "dataset");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::AdfError;
use crate::constants::FACTORY_TYPE_PREFIX;

/// Enumeration of the Data Factory resource kinds ADFX understands.
///
/// Serialized in kebab case (`"linked-service"`, `"pipeline"`), which is also
/// the form accepted by [`FromStr`] (case-insensitive, `_` and `-` optional).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Connection definition (`factories/linkedServices`)
    LinkedService,
    /// Compute environment (`factories/integrationRuntimes`)
    IntegrationRuntime,
    /// Named data structure bound to a linked service (`factories/datasets`)
    Dataset,
    /// Ordered set of activities (`factories/pipelines`)
    Pipeline,
    /// Schedule or event that starts pipelines (`factories/triggers`)
    Trigger,
    /// Any other resource type, including the factory itself
    Other,
}

impl ResourceKind {
    /// All kinds in catalog display order.
    pub const ALL: [Self; 6] = [
        Self::IntegrationRuntime,
        Self::LinkedService,
        Self::Dataset,
        Self::Pipeline,
        Self::Trigger,
        Self::Other,
    ];

    /// Classify a declared ARM `type` string.
    ///
    /// Only direct children of a Data Factory (`<provider>/factories/<collection>`)
    /// map to a known kind; the comparison is case-insensitive because exported
    /// templates are inconsistent about `linkedServices` vs `linkedservices`.
    #[must_use]
    pub fn from_arm_type(arm_type: &str) -> Self {
        let lowered = arm_type.trim().to_ascii_lowercase();
        let prefix = FACTORY_TYPE_PREFIX.to_ascii_lowercase();
        let Some(rest) = lowered.strip_prefix(&prefix) else {
            return Self::Other;
        };
        match rest.strip_prefix('/') {
            Some(collection) if !collection.contains('/') => Self::from_collection(collection),
            _ => Self::Other,
        }
    }

    /// Map the plural collection segment used in resource ids
    /// (`pipelines`, `datasets`, ...) to a kind.
    #[must_use]
    pub fn from_collection(segment: &str) -> Self {
        match segment.to_ascii_lowercase().as_str() {
            "linkedservices" => Self::LinkedService,
            "integrationruntimes" => Self::IntegrationRuntime,
            "datasets" => Self::Dataset,
            "pipelines" => Self::Pipeline,
            "triggers" => Self::Trigger,
            _ => Self::Other,
        }
    }

    /// Plural label used in summaries.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::LinkedService => "linked services",
            Self::IntegrationRuntime => "integration runtimes",
            Self::Dataset => "datasets",
            Self::Pipeline => "pipelines",
            Self::Trigger => "triggers",
            Self::Other => "other resources",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LinkedService => "linked-service",
            Self::IntegrationRuntime => "integration-runtime",
            Self::Dataset => "dataset",
            Self::Pipeline => "pipeline",
            Self::Trigger => "trigger",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

impl FromStr for ResourceKind {
    type Err = AdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String =
            s.chars().filter(|c| *c != '-' && *c != '_').collect::<String>().to_ascii_lowercase();
        match normalized.as_str() {
            "linkedservice" => Ok(Self::LinkedService),
            "integrationruntime" => Ok(Self::IntegrationRuntime),
            "dataset" => Ok(Self::Dataset),
            "pipeline" => Ok(Self::Pipeline),
            "trigger" => Ok(Self::Trigger),
            "other" => Ok(Self::Other),
            _ => Err(AdfError::InvalidResourceKind {
                kind: s.to_string(),
            }),
        }
    }
}
