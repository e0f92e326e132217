//! Activity Tree Flattener.
//!
//! Pipelines hold an ordered activity list, and container activities
//! (`ForEach`, `Until`, `IfCondition`, `Switch`) hold further lists of their
//! own. [`ActivityFlattener`] walks that tree depth-first and produces one flat
//! sequence per pipeline in which every activity remembers its immediate
//! container and the branch it sits in.
//!
//! Order is declaration order: a container is followed by the contents of its
//! first branch, then its second, and so on. Flattening the same pipeline
//! twice yields the same sequence.
//!
//! Activity names are unique per pipeline in valid factories. Two checks rely
//! on that and are reported rather than enforced:
//!
//! - a nested activity carrying the name of one of its own ancestors is a
//!   [`Warning::NestingCycle`]; descent stops there
//! - any other repeated name is a [`Warning::DuplicateActivityName`]
//!
//! Entries that are not objects, or lack a `name` or `type`, are skipped with
//! a [`Warning::InvalidActivity`].

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::catalog::{Catalog, Resource};
use crate::constants::{COPY, DATABRICKS_NOTEBOOK, EXECUTE_PIPELINE, FOR_EACH, IF_CONDITION, SWITCH, UNTIL};
use crate::core::{Diagnostics, EntityId, ResourceKind, Warning};
use crate::expression::{ExpressionResolver, Reference};

/// The nested list of its container an activity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    /// Loop body of `ForEach` / `Until`
    Body,
    IfTrue,
    IfFalse,
    /// A `Switch` case, by its `value`
    Case(String),
    /// `defaultActivities` of a `Switch`
    Default,
}

/// One `dependsOn` entry of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityDependency {
    /// Name of the prerequisite activity
    pub activity: String,
    /// `Succeeded`, `Failed`, `Skipped` or `Completed`
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityPolicy {
    pub timeout: Option<String>,
    pub retry: Option<String>,
    pub retry_interval_seconds: Option<u64>,
    pub secure_input: Option<bool>,
    pub secure_output: Option<bool>,
}

/// A flattened activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    /// Owning pipeline
    pub pipeline: String,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub description: Option<String>,
    /// Immediate container, `None` at top level
    pub parent: Option<String>,
    /// Branch of the parent this activity sits in
    pub branch: Option<Branch>,
    /// Nesting depth, 0 at top level
    pub depth: usize,
    pub is_container: bool,
    pub depends_on: Vec<ActivityDependency>,
    /// Datasets read
    pub inputs: Vec<Reference>,
    /// Datasets written
    pub outputs: Vec<Reference>,
    /// Pipeline invoked by an `ExecutePipeline` activity
    pub pipeline_ref: Option<Reference>,
    pub linked_service: Option<Reference>,
    pub policy: Option<ActivityPolicy>,
    pub source_type: Option<String>,
    pub sink_type: Option<String>,
    pub notebook_path: Option<String>,
}

impl Activity {
    pub fn id(&self) -> EntityId {
        EntityId::activity(&self.pipeline, &self.name)
    }

    pub fn is_execute_pipeline(&self) -> bool {
        self.activity_type == EXECUTE_PIPELINE
    }

    /// True when `other` shares this activity's activity list.
    pub fn is_sibling_of(&self, other: &Activity) -> bool {
        self.pipeline == other.pipeline && self.parent == other.parent && self.branch == other.branch
    }
}

/// The flattened activities of one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineActivities {
    pub pipeline: String,
    pub activities: Vec<Activity>,
}

impl PipelineActivities {
    /// First activity with the given name.
    pub fn find(&self, name: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.name == name)
    }

    /// Direct children of a container, in declaration order.
    pub fn children_of<'s>(&'s self, parent: &'s str) -> impl Iterator<Item = &'s Activity> + 's {
        self.activities.iter().filter(move |a| a.parent.as_deref() == Some(parent))
    }

    pub fn top_level(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(|a| a.parent.is_none())
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter().filter(|a| !a.is_container)
    }
}

/// Walks pipeline activity trees into flat sequences.
pub struct ActivityFlattener<'a> {
    resolver: &'a ExpressionResolver<'a>,
}

impl<'a> ActivityFlattener<'a> {
    pub fn new(resolver: &'a ExpressionResolver<'a>) -> Self {
        Self {
            resolver,
        }
    }

    /// Flatten every pipeline of the catalog, in catalog order.
    pub fn flatten_catalog(&self, catalog: &Catalog, diagnostics: &mut Diagnostics) -> Vec<PipelineActivities> {
        catalog
            .of_kind(ResourceKind::Pipeline)
            .map(|pipeline| self.flatten_pipeline(pipeline, diagnostics))
            .collect()
    }

    pub fn flatten_pipeline(&self, pipeline: &Resource, diagnostics: &mut Diagnostics) -> PipelineActivities {
        let activities = pipeline.properties.get("activities").unwrap_or(&Value::Null);
        PipelineActivities {
            pipeline: pipeline.name.clone(),
            activities: self.flatten(&pipeline.name, activities, diagnostics),
        }
    }

    /// Flatten an activity list belonging to `pipeline`.
    pub fn flatten(&self, pipeline: &str, activities: &Value, diagnostics: &mut Diagnostics) -> Vec<Activity> {
        let mut walk = Walk {
            resolver: self.resolver,
            pipeline,
            output: Vec::new(),
            seen: HashSet::new(),
            ancestors: Vec::new(),
            diagnostics,
        };
        walk.list(activities, None, None);

        tracing::debug!("Pipeline '{pipeline}': {} activities after flattening", walk.output.len());
        walk.output
    }
}

struct Walk<'w, 'r> {
    resolver: &'w ExpressionResolver<'r>,
    pipeline: &'w str,
    output: Vec<Activity>,
    seen: HashSet<String>,
    /// Names of the containers enclosing the list being walked
    ancestors: Vec<String>,
    diagnostics: &'w mut Diagnostics,
}

impl Walk<'_, '_> {
    fn list(&mut self, list: &Value, parent: Option<&str>, branch: Option<Branch>) {
        let Some(entries) = list.as_array() else {
            return;
        };

        for (index, entry) in entries.iter().enumerate() {
            let Some((name, activity_type)) = self.identify(index, entry) else {
                continue;
            };

            if self.ancestors.iter().any(|a| a == name) {
                self.diagnostics.push(Warning::NestingCycle {
                    pipeline: self.pipeline.to_string(),
                    activity: name.to_string(),
                });
                continue;
            }
            if !self.seen.insert(name.to_string()) {
                self.diagnostics.push(Warning::DuplicateActivityName {
                    pipeline: self.pipeline.to_string(),
                    activity: name.to_string(),
                });
            }

            let activity = self.extract(entry, name, activity_type, parent, branch.clone());
            let is_container = activity.is_container;
            self.output.push(activity);

            if is_container {
                self.ancestors.push(name.to_string());
                self.branches(entry, name, activity_type);
                self.ancestors.pop();
            }
        }
    }

    fn identify<'v>(&mut self, index: usize, entry: &'v Value) -> Option<(&'v str, &'v str)> {
        let name = entry.get("name").and_then(Value::as_str).filter(|n| !n.is_empty());
        let activity_type = entry.get("type").and_then(Value::as_str);
        let reason = match (name, activity_type) {
            (Some(name), Some(activity_type)) => return Some((name, activity_type)),
            _ if !entry.is_object() => "entry is not an object",
            (None, _) => "missing 'name'",
            (Some(_), None) => "missing 'type'",
        };
        self.diagnostics.push(Warning::InvalidActivity {
            pipeline: self.pipeline.to_string(),
            index,
            reason: reason.to_string(),
        });
        None
    }

    /// Walk the nested lists of a container in declaration order.
    fn branches(&mut self, entry: &Value, name: &str, activity_type: &str) {
        let props = entry.get("typeProperties").unwrap_or(&Value::Null);
        match activity_type {
            FOR_EACH | UNTIL => {
                self.list(props.get("activities").unwrap_or(&Value::Null), Some(name), Some(Branch::Body));
            }
            IF_CONDITION => {
                self.list(props.get("ifTrueActivities").unwrap_or(&Value::Null), Some(name), Some(Branch::IfTrue));
                self.list(
                    props.get("ifFalseActivities").unwrap_or(&Value::Null),
                    Some(name),
                    Some(Branch::IfFalse),
                );
            }
            SWITCH => {
                if let Some(cases) = props.get("cases").and_then(Value::as_array) {
                    for case in cases {
                        let value = match case.get("value") {
                            Some(Value::String(s)) => s.clone(),
                            Some(other) => other.to_string(),
                            None => String::new(),
                        };
                        self.list(case.get("activities").unwrap_or(&Value::Null), Some(name), Some(Branch::Case(value)));
                    }
                }
                self.list(props.get("defaultActivities").unwrap_or(&Value::Null), Some(name), Some(Branch::Default));
            }
            _ => {}
        }
    }

    fn extract(
        &mut self,
        entry: &Value,
        name: &str,
        activity_type: &str,
        parent: Option<&str>,
        branch: Option<Branch>,
    ) -> Activity {
        let props = entry.get("typeProperties").unwrap_or(&Value::Null);
        let context = format!("activity '{name}' of pipeline '{}'", self.pipeline);

        let mut inputs = self.references(entry.get("inputs"), &context);
        if let Some(dataset) = props.get("dataset") {
            inputs.push(self.required_reference(Some(dataset), &context));
        }
        let outputs = self.references(entry.get("outputs"), &context);

        let pipeline_ref = if activity_type == EXECUTE_PIPELINE {
            Some(self.required_reference(props.get("pipeline"), &context))
        } else {
            None
        };
        let linked_service = entry
            .get("linkedServiceName")
            .and_then(|ls| self.resolver.named_reference(ls, || context.clone(), self.diagnostics));

        let (source_type, sink_type) = if activity_type == COPY {
            (type_of(props.get("source")), type_of(props.get("sink")))
        } else {
            (None, None)
        };
        let notebook_path = if activity_type == DATABRICKS_NOTEBOOK {
            props.get("notebookPath").and_then(|path| self.text(path))
        } else {
            None
        };

        Activity {
            pipeline: self.pipeline.to_string(),
            name: name.to_string(),
            activity_type: activity_type.to_string(),
            description: entry.get("description").and_then(Value::as_str).map(String::from),
            parent: parent.map(String::from),
            branch,
            depth: self.ancestors.len(),
            is_container: matches!(activity_type, FOR_EACH | UNTIL | IF_CONDITION | SWITCH),
            depends_on: dependencies(entry.get("dependsOn")),
            inputs,
            outputs,
            pipeline_ref,
            linked_service,
            policy: entry.get("policy").map(policy),
            source_type,
            sink_type,
            notebook_path,
        }
    }

    fn references(&mut self, list: Option<&Value>, context: &str) -> Vec<Reference> {
        let Some(entries) = list.and_then(Value::as_array) else {
            return Vec::new();
        };
        entries.iter().map(|entry| self.required_reference(Some(entry), context)).collect()
    }

    /// Resolve a reference object that must name something. When no name
    /// can be read, the JSON found in its place becomes an unresolved name
    /// so the reference still shows up as an edge.
    fn required_reference(&mut self, value: Option<&Value>, context: &str) -> Reference {
        if let Some(reference) =
            value.and_then(|v| self.resolver.named_reference(v, || context.to_string(), self.diagnostics))
        {
            return reference;
        }

        let raw = match value {
            Some(v) => v.get("referenceName").unwrap_or(v).to_string(),
            None => Value::Null.to_string(),
        };
        let reason = "referenceName is missing or not a string";
        self.diagnostics.push(Warning::UnresolvableExpression {
            context: context.to_string(),
            raw: raw.clone(),
            reason: reason.to_string(),
        });
        Reference::unreadable(raw, reason)
    }

    /// Text of a string or `{"value": ...}` expression field, resolved.
    fn text(&self, value: &Value) -> Option<String> {
        let raw = match value {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("value")?.as_str()?,
            _ => return None,
        };
        Some(self.resolver.resolve(raw).value)
    }
}

fn type_of(value: Option<&Value>) -> Option<String> {
    value?.get("type")?.as_str().map(String::from)
}

fn dependencies(value: Option<&Value>) -> Vec<ActivityDependency> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let activity = entry.get("activity")?.as_str()?.to_string();
            let conditions = entry
                .get("dependencyConditions")
                .and_then(Value::as_array)
                .map(|c| c.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_default();
            Some(ActivityDependency {
                activity,
                conditions,
            })
        })
        .collect()
}

fn policy(value: &Value) -> ActivityPolicy {
    let text = |key: &str| match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    };
    ActivityPolicy {
        timeout: text("timeout"),
        retry: text("retry"),
        retry_interval_seconds: value.get("retryIntervalInSeconds").and_then(Value::as_u64),
        secure_input: value.get("secureInput").and_then(Value::as_bool),
        secure_output: value.get("secureOutput").and_then(Value::as_bool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Template;
    use serde_json::json;

    fn dataset_ref(name: &str) -> Value {
        json!({ "referenceName": name, "type": "DatasetReference" })
    }

    fn leaf(name: &str) -> Value {
        json!({ "name": name, "type": "Wait", "typeProperties": { "waitTimeInSeconds": 1 } })
    }

    fn flatten(activities: Value) -> (Vec<Activity>, Diagnostics) {
        let template = Template::from_value(json!({ "resources": [] })).unwrap();
        let resolver = ExpressionResolver::new(&template);
        let mut diagnostics = Diagnostics::new();
        let flat = ActivityFlattener::new(&resolver).flatten("PL", &activities, &mut diagnostics);
        (flat, diagnostics)
    }

    fn names(activities: &[Activity]) -> Vec<&str> {
        activities.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_if_condition_branches_are_tagged() {
        let (flat, diagnostics) = flatten(json!([{
            "name": "Check",
            "type": "IfCondition",
            "typeProperties": {
                "expression": { "value": "@bool(true)", "type": "Expression" },
                "ifTrueActivities": [leaf("WhenTrue")],
                "ifFalseActivities": [leaf("WhenFalse")]
            }
        }]));

        assert!(diagnostics.is_empty());
        let leaves: Vec<_> = flat.iter().filter(|a| !a.is_container).collect();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].name, "WhenTrue");
        assert_eq!(leaves[0].branch, Some(Branch::IfTrue));
        assert_eq!(leaves[0].parent.as_deref(), Some("Check"));
        assert_eq!(leaves[1].name, "WhenFalse");
        assert_eq!(leaves[1].branch, Some(Branch::IfFalse));
        assert_eq!(leaves[1].parent.as_deref(), Some("Check"));
        assert_eq!(leaves[1].depth, 1);
    }

    #[test]
    fn test_depth_first_declaration_order() {
        let (flat, _) = flatten(json!([
            leaf("First"),
            {
                "name": "Loop",
                "type": "ForEach",
                "typeProperties": {
                    "items": { "value": "@pipeline().parameters.tables", "type": "Expression" },
                    "activities": [
                        leaf("InLoop"),
                        {
                            "name": "Route",
                            "type": "Switch",
                            "typeProperties": {
                                "on": { "value": "@item().kind", "type": "Expression" },
                                "cases": [
                                    { "value": "a", "activities": [leaf("CaseA")] },
                                    { "value": "b", "activities": [leaf("CaseB")] }
                                ],
                                "defaultActivities": [leaf("Fallback")]
                            }
                        }
                    ]
                }
            },
            leaf("Last")
        ]));

        assert_eq!(names(&flat), vec!["First", "Loop", "InLoop", "Route", "CaseA", "CaseB", "Fallback", "Last"]);
        let case_b = flat.iter().find(|a| a.name == "CaseB").unwrap();
        assert_eq!(case_b.branch, Some(Branch::Case("b".to_string())));
        assert_eq!(case_b.parent.as_deref(), Some("Route"));
        assert_eq!(case_b.depth, 2);
        let fallback = flat.iter().find(|a| a.name == "Fallback").unwrap();
        assert_eq!(fallback.branch, Some(Branch::Default));
        assert_eq!(flat.iter().find(|a| a.name == "InLoop").unwrap().branch, Some(Branch::Body));
    }

    #[test]
    fn test_flattening_is_idempotent() {
        let activities = json!([{
            "name": "Until",
            "type": "Until",
            "typeProperties": { "activities": [leaf("A"), leaf("B")] }
        }]);
        let (first, _) = flatten(activities.clone());
        let (second, _) = flatten(activities);
        assert_eq!(first, second);
    }

    #[test]
    fn test_copy_activity_references() {
        let (flat, _) = flatten(json!([{
            "name": "Copy data",
            "type": "Copy",
            "dependsOn": [{ "activity": "Lookup", "dependencyConditions": ["Succeeded"] }],
            "policy": { "timeout": "0.12:00:00", "retry": 2, "secureInput": false, "secureOutput": true },
            "inputs": [dataset_ref("D1")],
            "outputs": [dataset_ref("D2")],
            "typeProperties": {
                "source": { "type": "AzureSqlSource" },
                "sink": { "type": "ParquetSink" }
            }
        }]));

        let copy = &flat[0];
        assert_eq!(copy.inputs[0].name, "D1");
        assert_eq!(copy.outputs[0].name, "D2");
        assert_eq!(copy.source_type.as_deref(), Some("AzureSqlSource"));
        assert_eq!(copy.sink_type.as_deref(), Some("ParquetSink"));
        assert_eq!(copy.depends_on[0].activity, "Lookup");
        assert_eq!(copy.depends_on[0].conditions, vec!["Succeeded"]);
        let policy = copy.policy.as_ref().unwrap();
        assert_eq!(policy.retry.as_deref(), Some("2"));
        assert_eq!(policy.secure_output, Some(true));
        assert!(!copy.is_container);
    }

    #[test]
    fn test_execute_pipeline_reference() {
        let (flat, _) = flatten(json!([{
            "name": "Run child",
            "type": "ExecutePipeline",
            "typeProperties": {
                "pipeline": { "referenceName": "PL_Child", "type": "PipelineReference" },
                "waitOnCompletion": true
            }
        }]));

        assert!(flat[0].is_execute_pipeline());
        assert_eq!(flat[0].pipeline_ref.as_ref().unwrap().name, "PL_Child");
        assert!(flat[0].inputs.is_empty());
    }

    #[test]
    fn test_unreadable_pipeline_reference_is_kept() {
        let (flat, diagnostics) = flatten(json!([{
            "name": "Run",
            "type": "ExecutePipeline",
            "typeProperties": { "pipeline": { "referenceName": 42, "type": "PipelineReference" } }
        }]));

        let reference = flat[0].pipeline_ref.as_ref().unwrap();
        assert_eq!(reference.name, "42");
        assert!(!reference.is_static());
        assert_eq!(diagnostics.count("unresolvable_expression"), 1);
    }

    #[test]
    fn test_lookup_dataset_and_linked_service() {
        let (flat, _) = flatten(json!([
            {
                "name": "Lookup",
                "type": "Lookup",
                "typeProperties": { "dataset": dataset_ref("DS_Config") }
            },
            {
                "name": "Notebook",
                "type": "DatabricksNotebook",
                "linkedServiceName": { "referenceName": "LS_Databricks", "type": "LinkedServiceReference" },
                "typeProperties": { "notebookPath": "/Shared/etl" }
            }
        ]));

        assert_eq!(flat[0].inputs[0].name, "DS_Config");
        assert_eq!(flat[1].linked_service.as_ref().unwrap().name, "LS_Databricks");
        assert_eq!(flat[1].notebook_path.as_deref(), Some("/Shared/etl"));
    }

    #[test]
    fn test_nested_activity_named_like_ancestor_stops_descent() {
        let (flat, diagnostics) = flatten(json!([{
            "name": "Loop",
            "type": "ForEach",
            "typeProperties": {
                "activities": [{
                    "name": "Loop",
                    "type": "ForEach",
                    "typeProperties": { "activities": [leaf("Hidden")] }
                }]
            }
        }]));

        assert_eq!(names(&flat), vec!["Loop"]);
        assert_eq!(diagnostics.count("nesting_cycle"), 1);
    }

    #[test]
    fn test_duplicate_and_invalid_activities() {
        let (flat, diagnostics) = flatten(json!([leaf("Same"), leaf("Same"), { "type": "Wait" }, "garbage"]));
        assert_eq!(names(&flat), vec!["Same", "Same"]);
        assert_eq!(diagnostics.count("duplicate_activity_name"), 1);
        assert_eq!(diagnostics.count("invalid_activity"), 2);
    }

    #[test]
    fn test_missing_activity_list_is_empty() {
        let (flat, diagnostics) = flatten(Value::Null);
        assert!(flat.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_pipeline_activities_queries() {
        let (flat, _) = flatten(json!([{
            "name": "Loop",
            "type": "ForEach",
            "typeProperties": { "activities": [leaf("A"), leaf("B")] }
        }, leaf("C")]));
        let pipeline = PipelineActivities {
            pipeline: "PL".to_string(),
            activities: flat,
        };
        assert_eq!(pipeline.children_of("Loop").count(), 2);
        assert_eq!(pipeline.top_level().count(), 2);
        assert_eq!(pipeline.leaves().count(), 3);
        let a = pipeline.find("A").unwrap();
        assert!(a.is_sibling_of(pipeline.find("B").unwrap()));
        assert!(!a.is_sibling_of(pipeline.find("C").unwrap()));
    }
}
