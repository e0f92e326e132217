//! Entity identifiers and edge kinds shared by the catalog, the activity
//! flattener and the dependency graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::resource::ResourceKind;

/// Kind of node that can appear in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    IntegrationRuntime,
    LinkedService,
    Dataset,
    Pipeline,
    Trigger,
    /// An activity, scoped to its owning pipeline
    Activity,
    Other,
}

impl From<ResourceKind> for EntityKind {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::LinkedService => Self::LinkedService,
            ResourceKind::IntegrationRuntime => Self::IntegrationRuntime,
            ResourceKind::Dataset => Self::Dataset,
            ResourceKind::Pipeline => Self::Pipeline,
            ResourceKind::Trigger => Self::Trigger,
            ResourceKind::Other => Self::Other,
        }
    }
}

impl EntityKind {
    /// The catalog kind backing this entity, `None` for activities.
    #[must_use]
    pub const fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            Self::LinkedService => Some(ResourceKind::LinkedService),
            Self::IntegrationRuntime => Some(ResourceKind::IntegrationRuntime),
            Self::Dataset => Some(ResourceKind::Dataset),
            Self::Pipeline => Some(ResourceKind::Pipeline),
            Self::Trigger => Some(ResourceKind::Trigger),
            Self::Other => Some(ResourceKind::Other),
            Self::Activity => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resource_kind() {
            Some(kind) => kind.fmt(f),
            None => f.write_str("activity"),
        }
    }
}

/// Identifies one node of the dependency graph.
///
/// Resources are identified by kind and resolved name. Activity names are
/// only unique inside their pipeline, so activities also carry the owning
/// pipeline's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
}

impl EntityId {
    /// Identify a catalog resource.
    pub fn resource(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            pipeline: None,
        }
    }

    /// Identify an activity within its pipeline.
    pub fn activity(pipeline: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Activity,
            name: name.into(),
            pipeline: Some(pipeline.into()),
        }
    }

    pub fn pipeline(name: impl Into<String>) -> Self {
        Self::resource(ResourceKind::Pipeline, name)
    }

    pub fn dataset(name: impl Into<String>) -> Self {
        Self::resource(ResourceKind::Dataset, name)
    }

    pub fn linked_service(name: impl Into<String>) -> Self {
        Self::resource(ResourceKind::LinkedService, name)
    }

    pub fn trigger(name: impl Into<String>) -> Self {
        Self::resource(ResourceKind::Trigger, name)
    }

    pub fn integration_runtime(name: impl Into<String>) -> Self {
        Self::resource(ResourceKind::IntegrationRuntime, name)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pipeline {
            Some(pipeline) => write!(f, "{}:{}/{}", self.kind, pipeline, self.name),
            None => write!(f, "{}:{}", self.kind, self.name),
        }
    }
}

/// Typed relation between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Owning pipeline → pipeline invoked by an `ExecutePipeline` activity
    PipelineCallsPipeline,
    /// Activity → dataset it reads
    ActivityReadsDataset,
    /// Activity → dataset it writes
    ActivityWritesDataset,
    /// Trigger → pipeline it starts
    TriggerFiresPipeline,
    /// Dataset → linked service it is bound to
    DatasetUsesLinkedService,
    /// Linked service → integration runtime it connects via
    LinkedServiceUsesIntegrationRuntime,
    /// Activity → linked service it executes against
    ActivityUsesLinkedService,
    /// Dependent activity → prerequisite activity (`dependsOn`)
    ActivityDependsOnActivity,
    /// Resource → resource named in its ARM-level `dependsOn`
    ResourceDependsOnResource,
}

impl EdgeKind {
    pub const ALL: [Self; 9] = [
        Self::PipelineCallsPipeline,
        Self::ActivityReadsDataset,
        Self::ActivityWritesDataset,
        Self::TriggerFiresPipeline,
        Self::DatasetUsesLinkedService,
        Self::LinkedServiceUsesIntegrationRuntime,
        Self::ActivityUsesLinkedService,
        Self::ActivityDependsOnActivity,
        Self::ResourceDependsOnResource,
    ];
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PipelineCallsPipeline => "pipeline_calls_pipeline",
            Self::ActivityReadsDataset => "activity_reads_dataset",
            Self::ActivityWritesDataset => "activity_writes_dataset",
            Self::TriggerFiresPipeline => "trigger_fires_pipeline",
            Self::DatasetUsesLinkedService => "dataset_uses_linked_service",
            Self::LinkedServiceUsesIntegrationRuntime => "linked_service_uses_integration_runtime",
            Self::ActivityUsesLinkedService => "activity_uses_linked_service",
            Self::ActivityDependsOnActivity => "activity_depends_on_activity",
            Self::ResourceDependsOnResource => "resource_depends_on_resource",
        };
        f.write_str(label)
    }
}
