//! Dependency Graph Builder.
//!
//! Derives typed edges from a complete [`Catalog`] and the flattened
//! activities of every pipeline. A reference whose target is not in the
//! catalog still becomes an edge, marked unresolved, and is reported once as
//! a [`Warning::DanglingReference`].

use strsim::levenshtein;

use super::DependencyGraph;
use crate::activity::{Activity, PipelineActivities};
use crate::catalog::{Catalog, Resource, ResourceDetails};
use crate::constants::SIMILARITY_THRESHOLD_PERCENT;
use crate::core::{Diagnostics, EdgeKind, EntityId, ResourceKind, Warning};
use crate::expression::Reference;

/// Builds a [`DependencyGraph`].
pub struct GraphBuilder<'a> {
    catalog: &'a Catalog,
    suggest_similar: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            suggest_similar: true,
        }
    }

    /// Whether dangling references carry a "did you mean" suggestion.
    #[must_use]
    pub fn suggest_similar(mut self, enabled: bool) -> Self {
        self.suggest_similar = enabled;
        self
    }

    pub fn build(&self, pipelines: &[PipelineActivities], diagnostics: &mut Diagnostics) -> DependencyGraph {
        let mut graph = DependencyGraph::new();

        for resource in self.catalog.iter() {
            let id = EntityId::resource(resource.kind(), &resource.name);
            graph.ensure_node(id.clone());
            self.resource_edges(&mut graph, &id, resource, diagnostics);
        }

        for pipeline in pipelines {
            for activity in &pipeline.activities {
                graph.ensure_node(activity.id());
            }
            for activity in &pipeline.activities {
                self.activity_edges(&mut graph, pipeline, activity, diagnostics);
            }
        }

        tracing::debug!(
            "Dependency graph: {} nodes, {} edges ({} unresolved)",
            graph.node_count(),
            graph.len(),
            graph.unresolved_edges().len()
        );
        graph
    }

    fn resource_edges(
        &self,
        graph: &mut DependencyGraph,
        id: &EntityId,
        resource: &Resource,
        diagnostics: &mut Diagnostics,
    ) {
        for dependency in &resource.depends_on {
            let known = dependency.resolved && self.catalog.contains(dependency.kind, &dependency.name);
            let target = EntityId::resource(dependency.kind, &dependency.name);
            self.link(graph, diagnostics, id, target, EdgeKind::ResourceDependsOnResource, known);
        }

        match &resource.details {
            ResourceDetails::Dataset(details) => {
                if let Some(reference) = &details.linked_service {
                    self.link_resource(
                        graph,
                        diagnostics,
                        id,
                        reference,
                        ResourceKind::LinkedService,
                        EdgeKind::DatasetUsesLinkedService,
                    );
                }
            }
            ResourceDetails::LinkedService(details) => {
                if let Some(reference) = &details.connect_via {
                    self.link_resource(
                        graph,
                        diagnostics,
                        id,
                        reference,
                        ResourceKind::IntegrationRuntime,
                        EdgeKind::LinkedServiceUsesIntegrationRuntime,
                    );
                }
            }
            ResourceDetails::Trigger(details) => {
                for entry in &details.pipelines {
                    self.link_resource(
                        graph,
                        diagnostics,
                        id,
                        &entry.pipeline,
                        ResourceKind::Pipeline,
                        EdgeKind::TriggerFiresPipeline,
                    );
                }
            }
            ResourceDetails::Pipeline(_) | ResourceDetails::IntegrationRuntime(_) | ResourceDetails::Other => {}
        }
    }

    fn activity_edges(
        &self,
        graph: &mut DependencyGraph,
        pipeline: &PipelineActivities,
        activity: &Activity,
        diagnostics: &mut Diagnostics,
    ) {
        let id = activity.id();

        if let Some(reference) = &activity.pipeline_ref {
            self.link_resource(
                graph,
                diagnostics,
                &EntityId::pipeline(&pipeline.pipeline),
                reference,
                ResourceKind::Pipeline,
                EdgeKind::PipelineCallsPipeline,
            );
        }

        for reference in &activity.inputs {
            self.link_resource(graph, diagnostics, &id, reference, ResourceKind::Dataset, EdgeKind::ActivityReadsDataset);
        }
        for reference in &activity.outputs {
            self.link_resource(graph, diagnostics, &id, reference, ResourceKind::Dataset, EdgeKind::ActivityWritesDataset);
        }
        if let Some(reference) = &activity.linked_service {
            self.link_resource(
                graph,
                diagnostics,
                &id,
                reference,
                ResourceKind::LinkedService,
                EdgeKind::ActivityUsesLinkedService,
            );
        }

        for dependency in &activity.depends_on {
            let known = pipeline
                .activities
                .iter()
                .any(|other| other.name == dependency.activity && other.is_sibling_of(activity));
            let target = EntityId::activity(&pipeline.pipeline, &dependency.activity);
            self.link(graph, diagnostics, &id, target, EdgeKind::ActivityDependsOnActivity, known);
        }
    }

    fn link_resource(
        &self,
        graph: &mut DependencyGraph,
        diagnostics: &mut Diagnostics,
        source: &EntityId,
        reference: &Reference,
        kind: ResourceKind,
        relation: EdgeKind,
    ) {
        let known = reference.is_static() && self.catalog.contains(kind, &reference.name);
        let target = EntityId::resource(kind, &reference.name);
        self.link(graph, diagnostics, source, target, relation, known);
    }

    fn link(
        &self,
        graph: &mut DependencyGraph,
        diagnostics: &mut Diagnostics,
        source: &EntityId,
        target: EntityId,
        relation: EdgeKind,
        known: bool,
    ) {
        if !graph.add_edge(source.clone(), target.clone(), relation, known) || known {
            return;
        }
        let suggestion = self.suggestion(&target);
        diagnostics.push(Warning::DanglingReference {
            from: source.clone(),
            to: target,
            relation,
            suggestion,
        });
    }

    /// Closest catalog name of the target's kind, within the similarity threshold.
    fn suggestion(&self, target: &EntityId) -> Option<String> {
        if !self.suggest_similar {
            return None;
        }
        let kind = target.kind.resource_kind()?;
        self.catalog
            .names_of(kind)
            .into_iter()
            .map(|name| (name, levenshtein(&target.name, name)))
            .filter(|(_, distance)| *distance <= target.name.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
            .min_by_key(|(_, distance)| *distance)
            .map(|(name, _)| name.to_string())
    }
}
