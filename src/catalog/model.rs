//! Typed per-kind details extracted from resource `properties`.
//!
//! Only the fields the graph builder and the summaries need are lifted out;
//! the full `properties` object stays on [`Resource`](super::Resource).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::constants::TUMBLING_WINDOW_TRIGGER;
use crate::core::{Diagnostics, ResourceKind};
use crate::expression::{ExpressionResolver, Reference};

/// Kind-specific data of a catalog resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResourceDetails {
    LinkedService(LinkedServiceDetails),
    IntegrationRuntime(IntegrationRuntimeDetails),
    Dataset(DatasetDetails),
    Pipeline(PipelineDetails),
    Trigger(TriggerDetails),
    Other,
}

impl ResourceDetails {
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::LinkedService(_) => ResourceKind::LinkedService,
            Self::IntegrationRuntime(_) => ResourceKind::IntegrationRuntime,
            Self::Dataset(_) => ResourceKind::Dataset,
            Self::Pipeline(_) => ResourceKind::Pipeline,
            Self::Trigger(_) => ResourceKind::Trigger,
            Self::Other => ResourceKind::Other,
        }
    }

    /// Extract the details for `kind` from a resource's `properties`.
    pub(crate) fn extract(
        kind: ResourceKind,
        owner: &str,
        properties: &Value,
        resolver: &ExpressionResolver<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut extractor = Extractor {
            owner,
            properties,
            resolver,
            diagnostics,
        };
        match kind {
            ResourceKind::LinkedService => Self::LinkedService(extractor.linked_service()),
            ResourceKind::IntegrationRuntime => {
                Self::IntegrationRuntime(extractor.integration_runtime())
            }
            ResourceKind::Dataset => Self::Dataset(extractor.dataset()),
            ResourceKind::Pipeline => Self::Pipeline(extractor.pipeline()),
            ResourceKind::Trigger => Self::Trigger(extractor.trigger()),
            ResourceKind::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedServiceDetails {
    pub service_type: Option<String>,
    pub description: Option<String>,
    /// Integration runtime from `connectVia`
    pub connect_via: Option<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationRuntimeDetails {
    pub runtime_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetDetails {
    pub dataset_type: Option<String>,
    pub linked_service: Option<Reference>,
    pub folder: Option<String>,
    /// Declared dataset parameter names
    pub parameters: Vec<String>,
    /// `schema` or legacy `structure`, kept opaque
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: Option<String>,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineDetails {
    pub folder: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<PipelineParameter>,
    pub annotations: Vec<String>,
    /// Declared pipeline variable names
    pub variables: Vec<String>,
    /// Number of top-level activities
    pub activity_count: usize,
}

/// Recurrence of a schedule-based trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub frequency: Option<String>,
    pub interval: Option<u64>,
    /// `startTime` as written
    pub start_time: Option<String>,
    /// `startTime` parsed as UTC, when it is a valid timestamp
    pub start: Option<DateTime<Utc>>,
    pub time_zone: Option<String>,
    /// Detailed `schedule` block (hours, minutes, week days), opaque
    pub schedule: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerPipeline {
    pub pipeline: Reference,
    /// Names of the parameters passed to the pipeline
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerDetails {
    pub trigger_type: Option<String>,
    pub runtime_state: Option<String>,
    pub annotations: Vec<String>,
    pub schedule: Option<Schedule>,
    pub pipelines: Vec<TriggerPipeline>,
}

struct Extractor<'a, 'r> {
    owner: &'a str,
    properties: &'a Value,
    resolver: &'a ExpressionResolver<'r>,
    diagnostics: &'a mut Diagnostics,
}

impl Extractor<'_, '_> {
    fn text(&self, key: &str) -> Option<String> {
        text_field(self.properties, key)
    }

    fn reference(&mut self, value: Option<&Value>, what: &str) -> Option<Reference> {
        let owner = self.owner;
        self.resolver.named_reference(value?, || format!("{what} of {owner}"), self.diagnostics)
    }

    fn linked_service(&mut self) -> LinkedServiceDetails {
        let properties = self.properties;
        LinkedServiceDetails {
            service_type: self.text("type"),
            description: self.text("description"),
            connect_via: self.reference(properties.get("connectVia"), "connectVia"),
        }
    }

    fn integration_runtime(&self) -> IntegrationRuntimeDetails {
        IntegrationRuntimeDetails {
            runtime_type: self.text("type"),
            description: self.text("description"),
        }
    }

    fn dataset(&mut self) -> DatasetDetails {
        let properties = self.properties;
        DatasetDetails {
            dataset_type: self.text("type"),
            linked_service: self.reference(properties.get("linkedServiceName"), "linkedServiceName"),
            folder: folder_name(properties),
            parameters: object_keys(properties.get("parameters")),
            schema: properties.get("schema").or_else(|| properties.get("structure")).cloned(),
        }
    }

    fn pipeline(&self) -> PipelineDetails {
        let parameters = match self.properties.get("parameters") {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, declaration)| PipelineParameter {
                    name: name.clone(),
                    param_type: text_field(declaration, "type"),
                    default_value: declaration.get("defaultValue").cloned(),
                })
                .collect(),
            _ => Vec::new(),
        };

        PipelineDetails {
            folder: folder_name(self.properties),
            description: self.text("description"),
            parameters,
            annotations: annotations(self.properties),
            variables: object_keys(self.properties.get("variables")),
            activity_count: self
                .properties
                .get("activities")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        }
    }

    fn trigger(&mut self) -> TriggerDetails {
        let properties = self.properties;
        let trigger_type = self.text("type");
        let type_properties = properties.get("typeProperties").unwrap_or(&Value::Null);

        let recurrence = match type_properties.get("recurrence") {
            Some(recurrence) => Some(recurrence),
            None if trigger_type.as_deref() == Some(TUMBLING_WINDOW_TRIGGER) => {
                Some(type_properties)
            }
            None => None,
        };

        let mut pipelines = Vec::new();
        if let Some(Value::Array(entries)) = properties.get("pipelines") {
            for entry in entries {
                if let Some(pipeline) = self.trigger_pipeline(entry) {
                    pipelines.push(pipeline);
                }
            }
        }
        if let Some(entry) = properties.get("pipeline")
            && let Some(pipeline) = self.trigger_pipeline(entry)
        {
            pipelines.push(pipeline);
        }

        TriggerDetails {
            trigger_type,
            runtime_state: self.text("runtimeState"),
            annotations: annotations(properties),
            schedule: recurrence.map(schedule),
            pipelines,
        }
    }

    fn trigger_pipeline(&mut self, entry: &Value) -> Option<TriggerPipeline> {
        let pipeline = self.reference(entry.get("pipelineReference"), "pipelineReference")?;
        Some(TriggerPipeline {
            pipeline,
            parameters: object_keys(entry.get("parameters")),
        })
    }
}

fn schedule(recurrence: &Value) -> Schedule {
    let start_time = text_field(recurrence, "startTime");
    let interval = match recurrence.get("interval") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    Schedule {
        frequency: text_field(recurrence, "frequency"),
        interval,
        start: start_time.as_deref().and_then(parse_timestamp),
        start_time,
        time_zone: text_field(recurrence, "timeZone"),
        schedule: recurrence.get("schedule").cloned(),
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO one taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}

/// `folder` is either `{"name": "..."}` or a bare string.
fn folder_name(properties: &Value) -> Option<String> {
    match properties.get("folder")? {
        Value::Object(folder) => folder.get("name").and_then(Value::as_str).map(String::from),
        Value::String(name) => Some(name.clone()),
        _ => None,
    }
}

fn object_keys(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

fn annotations(properties: &Value) -> Vec<String> {
    match properties.get("annotations") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}
