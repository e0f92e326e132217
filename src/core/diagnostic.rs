//! Non-fatal findings recorded while analyzing a template.
//!
//! A partial, best-effort model is always preferred over an early abort, so
//! every recoverable problem becomes a [`Warning`] that travels alongside the
//! result. [`Diagnostics`] collects them in discovery order and mirrors each
//! one to the `tracing` log as it is recorded.

use serde::Serialize;
use thiserror::Error;

use super::entity::{EdgeKind, EntityId};
use super::resource::ResourceKind;

/// A recoverable data-quality finding.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum Warning {
    /// An expression could not be evaluated; the raw text was kept.
    #[error("Unresolvable expression in {context}: {raw} ({reason})")]
    UnresolvableExpression {
        /// Where the expression was found, e.g. `name of resource #3`
        context: String,
        /// The expression as written in the template
        raw: String,
        /// Why evaluation stopped
        reason: String,
    },

    /// Two resources of one kind resolved to the same name; the first wins.
    #[error("Duplicate {kind} name '{name}': resource #{duplicate_index} collides with #{first_index}")]
    DuplicateResourceName {
        kind: ResourceKind,
        name: String,
        /// Position of the kept declaration in the template
        first_index: usize,
        /// Position of the ignored declaration
        duplicate_index: usize,
    },

    /// A reference names an entity that is not in the catalog.
    #[error("{from} references unknown {to} ({relation}){}", did_you_mean(.suggestion))]
    DanglingReference {
        from: EntityId,
        to: EntityId,
        relation: EdgeKind,
        /// Closest known name of the expected kind, if any
        suggestion: Option<String>,
    },

    /// A container activity appears among its own descendants.
    #[error("Activity '{activity}' in pipeline '{pipeline}' is nested inside itself; descent stopped")]
    NestingCycle { pipeline: String, activity: String },

    /// Two activities of one pipeline share a name.
    #[error("Activity name '{activity}' is declared more than once in pipeline '{pipeline}'")]
    DuplicateActivityName { pipeline: String, activity: String },

    /// An activity entry lacks the fields needed to extract it.
    #[error("Activity #{index} in pipeline '{pipeline}' skipped: {reason}")]
    InvalidActivity {
        pipeline: String,
        /// Position within its enclosing activity list
        index: usize,
        reason: String,
    },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion.as_ref().map(|s| format!("; did you mean '{s}'?")).unwrap_or_default()
}

impl Warning {
    /// Short machine-friendly label, matching the serialized tag.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnresolvableExpression { .. } => "unresolvable_expression",
            Self::DuplicateResourceName { .. } => "duplicate_resource_name",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::NestingCycle { .. } => "nesting_cycle",
            Self::DuplicateActivityName { .. } => "duplicate_activity_name",
            Self::InvalidActivity { .. } => "invalid_activity",
        }
    }
}

/// Ordered collection of warnings produced by one analysis run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!(code = warning.code(), "{warning}");
        self.warnings.push(warning);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of warnings with the given [`Warning::code`].
    pub fn count(&self, code: &str) -> usize {
        self.warnings.iter().filter(|w| w.code() == code).count()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}
