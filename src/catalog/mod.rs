//! Resource Catalog Builder.
//!
//! Classifies every entry of the template's `resources` array by its declared
//! ARM `type`, resolves its name, and indexes it by `(kind, name)`.
//!
//! # Naming
//!
//! Exported factories name their children `factory/LocalName`, written as
//! `[concat(parameters('factoryName'), '/LocalName')]`. The builder resolves
//! the whole expression and splits on the first `/`, keeping the factory part
//! separately. When the expression cannot be evaluated as a whole, each
//! `concat` argument is resolved on its own and a failing argument keeps its
//! source text, so `[concat(parameters('factoryName'), '/', variables('x'))]`
//! becomes `variables('x')`. Any other unevaluated name is kept verbatim.
//!
//! # Duplicates
//!
//! `(kind, name)` keys are unique. When two resources of one kind resolve to
//! the same name the first declaration is kept and a
//! [`Warning::DuplicateResourceName`] is recorded for the second.
//!
//! # Examples
//!
//! ```rust
//! use adfx_cli::catalog::CatalogBuilder;
//! use adfx_cli::core::{Diagnostics, ResourceKind};
//! use adfx_cli::expression::ExpressionResolver;
//! use adfx_cli::template::Template;
//! use serde_json::json;
//!
//! let template = Template::from_value(json!({
//!     "parameters": { "factoryName": { "type": "string", "defaultValue": "MyFactory" } },
//!     "resources": [{
//!         "name": "[concat(parameters('factoryName'), '/DS_Sales')]",
//!         "type": "Microsoft.DataFactory/factories/datasets",
//!         "properties": { "type": "AzureSqlTable" }
//!     }]
//! })).unwrap();
//!
//! let resolver = ExpressionResolver::new(&template);
//! let mut diagnostics = Diagnostics::new();
//! let catalog = CatalogBuilder::new(&resolver).build(&template, &mut diagnostics);
//!
//! let dataset = catalog.get(ResourceKind::Dataset, "DS_Sales").unwrap();
//! assert_eq!(dataset.factory.as_deref(), Some("MyFactory"));
//! ```

pub mod model;

pub use model::{
    DatasetDetails, IntegrationRuntimeDetails, LinkedServiceDetails, PipelineDetails,
    PipelineParameter, ResourceDetails, Schedule, TriggerDetails, TriggerPipeline,
};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::core::{Diagnostics, ResourceKind, Warning};
use crate::expression::ExpressionResolver;
use crate::template::{RawResource, Template};

/// A resource named in another resource's ARM `dependsOn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDependency {
    pub kind: ResourceKind,
    pub name: String,
    /// The `dependsOn` entry as written
    pub raw: String,
    /// False when the entry could not be evaluated and the name was guessed
    pub resolved: bool,
}

/// A classified, named template resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    /// Position in the template's `resources` array
    pub index: usize,
    pub arm_type: String,
    /// Declared `name`, usually an expression
    pub raw_name: String,
    /// Local name with the factory prefix removed
    pub name: String,
    /// Factory part of the resolved name, when present
    pub factory: Option<String>,
    pub depends_on: Vec<ResourceDependency>,
    #[serde(flatten)]
    pub details: ResourceDetails,
    /// Full `properties` object as declared
    #[serde(skip)]
    pub properties: Value,
}

impl Resource {
    pub const fn kind(&self) -> ResourceKind {
        self.details.kind()
    }

    pub fn as_pipeline(&self) -> Option<&PipelineDetails> {
        match &self.details {
            ResourceDetails::Pipeline(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&DatasetDetails> {
        match &self.details {
            ResourceDetails::Dataset(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_trigger(&self) -> Option<&TriggerDetails> {
        match &self.details {
            ResourceDetails::Trigger(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_linked_service(&self) -> Option<&LinkedServiceDetails> {
        match &self.details {
            ResourceDetails::LinkedService(details) => Some(details),
            _ => None,
        }
    }
}

/// Resources indexed by `(kind, resolved name)`, in declaration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    resources: Vec<Resource>,
    #[serde(skip)]
    index: HashMap<(ResourceKind, String), usize>,
}

impl Catalog {
    /// Look up a resource by kind and resolved name.
    ///
    /// `Other` resources are indexed per ARM type, so for that kind the first
    /// declaration with the name is returned.
    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        if kind == ResourceKind::Other {
            return self.of_kind(kind).find(|r| r.name == name);
        }
        self.index.get(&(kind, name.to_string())).map(|&i| &self.resources[i])
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// All resources, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn names_of(&self, kind: ResourceKind) -> Vec<&str> {
        self.of_kind(kind).map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Insert unless the key is taken; returns the index of the holder.
    fn insert(&mut self, resource: Resource) -> Result<(), usize> {
        let key = index_key(&resource);
        if let Some(&existing) = self.index.get(&key) {
            return Err(existing);
        }
        self.index.insert(key, self.resources.len());
        self.resources.push(resource);
        Ok(())
    }
}

/// Builds a [`Catalog`] from a [`Template`].
pub struct CatalogBuilder<'a> {
    resolver: &'a ExpressionResolver<'a>,
    keep_other_resources: bool,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(resolver: &'a ExpressionResolver<'a>) -> Self {
        Self {
            resolver,
            keep_other_resources: true,
        }
    }

    /// Whether resources of unrecognized types are kept as `Other`.
    #[must_use]
    pub fn keep_other_resources(mut self, keep: bool) -> Self {
        self.keep_other_resources = keep;
        self
    }

    pub fn build(&self, template: &Template, diagnostics: &mut Diagnostics) -> Catalog {
        let mut catalog = Catalog::default();

        for raw in template.resources() {
            let kind = ResourceKind::from_arm_type(&raw.arm_type);
            if kind == ResourceKind::Other && !self.keep_other_resources {
                tracing::debug!("Skipping resource #{} of type {}", raw.index, raw.arm_type);
                continue;
            }

            let resource = self.classify(kind, raw, diagnostics);
            tracing::trace!("Resource #{} classified as {kind} '{}'", raw.index, resource.name);

            let name = resource.name.clone();
            if let Err(first_index) = catalog.insert(resource) {
                diagnostics.push(Warning::DuplicateResourceName {
                    kind,
                    name,
                    first_index: catalog.resources[first_index].index,
                    duplicate_index: raw.index,
                });
            }
        }

        tracing::debug!(
            "Catalog built: {}",
            ResourceKind::ALL
                .iter()
                .map(|k| format!("{} {}", catalog.count(*k), k.plural()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        catalog
    }

    fn classify(&self, kind: ResourceKind, raw: &RawResource, diagnostics: &mut Diagnostics) -> Resource {
        let resolution = self.resolver.resolve_reported(
            &raw.name,
            || format!("name of resource #{}", raw.index),
            diagnostics,
        );
        let (factory, name) = if resolution.is_unresolved() {
            self.split_unresolved(&raw.name)
        } else {
            split_name(&resolution.value)
        };

        let owner = format!("{kind} '{name}'");
        let depends_on = raw
            .depends_on
            .iter()
            .map(|entry| self.dependency(entry, &owner, diagnostics))
            .collect();
        let details = ResourceDetails::extract(kind, &owner, &raw.properties, self.resolver, diagnostics);

        Resource {
            index: raw.index,
            arm_type: raw.arm_type.clone(),
            raw_name: raw.name.clone(),
            name,
            factory,
            depends_on,
            details,
            properties: raw.properties.clone(),
        }
    }

    /// Name that did not evaluate as a whole: each `concat` argument is
    /// resolved on its own and failing ones keep their source text. Anything
    /// else keeps the raw string.
    fn split_unresolved(&self, raw: &str) -> (Option<String>, String) {
        match self.resolver.resolve_segments(raw) {
            Some(segments) => split_name(&segments.iter().map(|s| s.value.as_str()).collect::<String>()),
            None => (None, raw.to_string()),
        }
    }

    fn dependency(&self, entry: &str, owner: &str, diagnostics: &mut Diagnostics) -> ResourceDependency {
        let resolution =
            self.resolver.resolve_reported(entry, || format!("dependsOn of {owner}"), diagnostics);

        let parsed = if resolution.is_unresolved() {
            dependency_from_raw(entry)
        } else {
            dependency_from_id(&resolution.value)
        };
        let (collection, name) = parsed.unwrap_or_else(|| (String::new(), resolution.value.clone()));

        ResourceDependency {
            kind: ResourceKind::from_collection(&collection),
            name,
            raw: entry.to_string(),
            resolved: !resolution.is_unresolved(),
        }
    }
}

/// Unrecognized types all share [`ResourceKind::Other`]; qualify their key
/// with the ARM type so a data flow and a credential may share a name.
fn index_key(resource: &Resource) -> (ResourceKind, String) {
    match resource.kind() {
        ResourceKind::Other => (
            ResourceKind::Other,
            format!("{}|{}", resource.arm_type.to_ascii_lowercase(), resource.name),
        ),
        kind => (kind, resource.name.clone()),
    }
}

/// Split `factory/local` on the first `/`.
fn split_name(value: &str) -> (Option<String>, String) {
    match value.split_once('/') {
        Some((factory, local)) if !local.is_empty() => (Some(factory.to_string()), local.to_string()),
        _ => (None, value.to_string()),
    }
}

/// `(collection, name)` from a resolved resource id such as
/// `Microsoft.DataFactory/factories/MyFactory/datasets/DS1`.
fn dependency_from_id(id: &str) -> Option<(String, String)> {
    let mut segments = id.rsplit('/');
    let name = segments.next().filter(|s| !s.is_empty())?;
    let collection = segments.next()?;
    Some((collection.to_string(), name.to_string()))
}

/// `(collection, name)` from the literal tail of an unevaluated entry such
/// as `[concat(resourceId(...), '/datasets/DS1')]`.
fn dependency_from_raw(raw: &str) -> Option<(String, String)> {
    let re = Regex::new(r"/(\w+)/([^'/\]\)]+)'?\s*\)?\]?$").ok()?;
    let caps = re.captures(raw)?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().trim().to_string()))
}
