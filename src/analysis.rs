//! One complete analysis run over a template.
//!
//! [`Analysis::run`] drives the pipeline in its fixed order: the catalog is
//! built first, then every pipeline is flattened, and only then is the
//! dependency graph derived, so no edge is ever computed against a partial
//! catalog. Warnings from every stage are collected in discovery order.

use serde::Serialize;
use serde_json::Value;

use crate::activity::{ActivityFlattener, PipelineActivities};
use crate::catalog::{Catalog, CatalogBuilder};
use crate::config::AnalysisConfig;
use crate::constants::DEFAULT_LOCATION;
use crate::core::{AdfError, Diagnostics, Warning};
use crate::expression::ExpressionResolver;
use crate::graph::{DependencyGraph, GraphBuilder};
use crate::template::Template;

/// Factory-level facts read from the template's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactoryInfo {
    /// Resolved default of the factory parameter, if declared
    pub name: Option<String>,
    pub location: String,
    pub content_version: Option<String>,
}

/// A template parameter other than the factory name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: Option<String>,
    /// Default value rendered as text
    pub value: Option<String>,
}

/// The resolved model of one template.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub factory: FactoryInfo,
    pub global_parameters: Vec<GlobalParameter>,
    pub catalog: Catalog,
    pub activities: Vec<PipelineActivities>,
    pub graph: DependencyGraph,
    pub warnings: Vec<Warning>,
}

impl Analysis {
    /// Analyze a loaded template.
    pub fn run(template: &Template, config: &AnalysisConfig) -> Self {
        let resolver =
            ExpressionResolver::new(template).with_runtime_prefix(&config.runtime_placeholder_prefix);
        let mut diagnostics = Diagnostics::new();

        let catalog = CatalogBuilder::new(&resolver)
            .keep_other_resources(config.keep_other_resources)
            .build(template, &mut diagnostics);
        let activities = ActivityFlattener::new(&resolver).flatten_catalog(&catalog, &mut diagnostics);
        let graph = GraphBuilder::new(&catalog)
            .suggest_similar(config.suggest_similar)
            .build(&activities, &mut diagnostics);

        tracing::debug!(
            "Analysis complete: {} resources, {} edges, {} warnings",
            catalog.len(),
            graph.len(),
            diagnostics.len()
        );

        Self {
            factory: factory_info(template, &resolver, &config.factory_parameter),
            global_parameters: global_parameters(template, &resolver, &config.factory_parameter),
            catalog,
            activities,
            graph,
            warnings: diagnostics.into_vec(),
        }
    }

    /// Validate a decoded document and analyze it.
    ///
    /// # Errors
    ///
    /// [`AdfError::MalformedTemplate`] when the document cannot be walked.
    pub fn from_value(document: Value, config: &AnalysisConfig) -> Result<Self, AdfError> {
        let template = Template::from_value(document)?;
        Ok(Self::run(&template, config))
    }

    /// Flattened activities of one pipeline.
    pub fn activities_of(&self, pipeline: &str) -> Option<&PipelineActivities> {
        self.activities.iter().find(|p| p.pipeline == pipeline)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

fn factory_info(template: &Template, resolver: &ExpressionResolver<'_>, factory_parameter: &str) -> FactoryInfo {
    let name = template
        .parameter(factory_parameter)
        .and_then(|p| p.default_value.as_ref())
        .map(|value| render(resolver, value));

    let location = template
        .parameters()
        .iter()
        .find(|p| p.name.to_ascii_lowercase().contains("location"))
        .and_then(|p| p.default_value.as_ref())
        .map_or_else(|| DEFAULT_LOCATION.to_string(), |value| render(resolver, value));

    FactoryInfo {
        name,
        location,
        content_version: template.content_version().map(String::from),
    }
}

fn global_parameters(
    template: &Template,
    resolver: &ExpressionResolver<'_>,
    factory_parameter: &str,
) -> Vec<GlobalParameter> {
    template
        .parameters()
        .iter()
        .filter(|p| p.name != factory_parameter)
        .map(|p| GlobalParameter {
            name: p.name.clone(),
            param_type: p.param_type.clone(),
            value: p.default_value.as_ref().map(|value| render(resolver, value)),
        })
        .collect()
}

/// Text of a parameter default; string defaults may be expressions.
fn render(resolver: &ExpressionResolver<'_>, value: &Value) -> String {
    match value {
        Value::String(s) => resolver.resolve(s).value,
        other => other.to_string(),
    }
}
