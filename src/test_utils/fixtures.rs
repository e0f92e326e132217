//! Builders for sample ARM templates.
//!
//! Templates are produced the way the Data Factory export produces them:
//! every resource name is `[concat(parameters('factoryName'), '/<name>')]`
//! and every ARM `dependsOn` entry goes through the `factoryId` variable.

use serde_json::{Value, json};

use crate::constants::FACTORY_TYPE_PREFIX;

/// Incrementally assembles an exported factory template.
#[derive(Clone, Debug)]
pub struct TemplateBuilder {
    parameters: serde_json::Map<String, Value>,
    variables: serde_json::Map<String, Value>,
    resources: Vec<Value>,
}

impl TemplateBuilder {
    /// Template for a factory with the given default name.
    pub fn new(factory: &str) -> Self {
        let mut parameters = serde_json::Map::new();
        parameters.insert(
            "factoryName".to_string(),
            json!({ "type": "string", "metadata": "Data Factory name", "defaultValue": factory }),
        );
        let mut variables = serde_json::Map::new();
        variables.insert(
            "factoryId".to_string(),
            json!("[concat('Microsoft.DataFactory/factories/', parameters('factoryName'))]"),
        );
        Self {
            parameters,
            variables,
            resources: Vec::new(),
        }
    }

    pub fn parameter(mut self, name: &str, param_type: &str, default_value: Value) -> Self {
        self.parameters
            .insert(name.to_string(), json!({ "type": param_type, "defaultValue": default_value }));
        self
    }

    pub fn variable(mut self, name: &str, value: Value) -> Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    /// Any factory child resource; `collection` is the ARM type suffix
    /// (`pipelines`, `dataflows`, ...).
    pub fn resource(mut self, collection: &str, name: &str, properties: Value) -> Self {
        self.resources.push(json!({
            "name": format!("[concat(parameters('factoryName'), '/{name}')]"),
            "type": format!("{FACTORY_TYPE_PREFIX}/{collection}"),
            "apiVersion": "2018-06-01",
            "properties": properties,
            "dependsOn": []
        }));
        self
    }

    /// Append an ARM `dependsOn` entry to the most recently added resource.
    pub fn depends_on(mut self, collection: &str, name: &str) -> Self {
        if let Some(Value::Array(entries)) = self.resources.last_mut().and_then(|r| r.get_mut("dependsOn")) {
            entries.push(json!(format!("[concat(variables('factoryId'), '/{collection}/{name}')]")));
        }
        self
    }

    pub fn integration_runtime(self, name: &str, runtime_type: &str) -> Self {
        self.resource("integrationRuntimes", name, json!({ "type": runtime_type, "typeProperties": {} }))
    }

    pub fn linked_service(self, name: &str, service_type: &str, connect_via: Option<&str>) -> Self {
        let mut properties = json!({ "type": service_type, "annotations": [], "typeProperties": {} });
        if let Some(runtime) = connect_via {
            properties["connectVia"] = json!({ "referenceName": runtime, "type": "IntegrationRuntimeReference" });
        }
        let builder = self.resource("linkedServices", name, properties);
        match connect_via {
            Some(runtime) => builder.depends_on("integrationRuntimes", runtime),
            None => builder,
        }
    }

    pub fn dataset(self, name: &str, dataset_type: &str, linked_service: &str) -> Self {
        self.resource(
            "datasets",
            name,
            json!({
                "linkedServiceName": { "referenceName": linked_service, "type": "LinkedServiceReference" },
                "annotations": [],
                "type": dataset_type,
                "schema": []
            }),
        )
        .depends_on("linkedServices", linked_service)
    }

    pub fn pipeline(self, name: &str, activities: Vec<Value>) -> Self {
        self.resource(
            "pipelines",
            name,
            json!({ "activities": activities, "policy": { "elapsedTimeMetrics": {} }, "annotations": [] }),
        )
    }

    /// Schedule trigger starting the given pipelines.
    pub fn trigger(self, name: &str, frequency: &str, interval: u64, pipelines: &[&str]) -> Self {
        let references: Vec<Value> = pipelines
            .iter()
            .map(|p| {
                json!({
                    "pipelineReference": { "referenceName": p, "type": "PipelineReference" },
                    "parameters": {}
                })
            })
            .collect();
        let mut builder = self.resource(
            "triggers",
            name,
            json!({
                "annotations": [],
                "runtimeState": "Started",
                "pipelines": references,
                "type": "ScheduleTrigger",
                "typeProperties": {
                    "recurrence": {
                        "frequency": frequency,
                        "interval": interval,
                        "startTime": "2024-01-01T06:00:00Z",
                        "timeZone": "UTC"
                    }
                }
            }),
        );
        for pipeline in pipelines {
            builder = builder.depends_on("pipelines", pipeline);
        }
        builder
    }

    pub fn build(self) -> Value {
        json!({
            "$schema": "http://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#",
            "contentVersion": "1.0.0.0",
            "parameters": self.parameters,
            "variables": self.variables,
            "resources": self.resources
        })
    }

    /// Rendered JSON text, for writing template files.
    pub fn build_string(self) -> String {
        serde_json::to_string_pretty(&self.build()).unwrap_or_default()
    }
}

/// `{"referenceName": .., "type": "DatasetReference"}`.
pub fn dataset_ref(name: &str) -> Value {
    json!({ "referenceName": name, "type": "DatasetReference", "parameters": {} })
}

/// Copy activity reading `input` and writing `output`.
pub fn copy_activity(name: &str, input: &str, output: &str) -> Value {
    json!({
        "name": name,
        "type": "Copy",
        "dependsOn": [],
        "policy": { "timeout": "0.12:00:00", "retry": 0, "retryIntervalInSeconds": 30 },
        "typeProperties": {
            "source": { "type": "AzureSqlSource" },
            "sink": { "type": "ParquetSink" }
        },
        "inputs": [dataset_ref(input)],
        "outputs": [dataset_ref(output)]
    })
}

/// ExecutePipeline activity invoking `pipeline`.
pub fn execute_pipeline(name: &str, pipeline: &str) -> Value {
    json!({
        "name": name,
        "type": "ExecutePipeline",
        "dependsOn": [],
        "typeProperties": {
            "pipeline": { "referenceName": pipeline, "type": "PipelineReference" },
            "waitOnCompletion": true
        }
    })
}

/// Wait activity; the simplest leaf.
pub fn wait_activity(name: &str) -> Value {
    json!({ "name": name, "type": "Wait", "dependsOn": [], "typeProperties": { "waitTimeInSeconds": 1 } })
}

/// ForEach container over `@pipeline().parameters.items`.
pub fn for_each(name: &str, activities: Vec<Value>) -> Value {
    json!({
        "name": name,
        "type": "ForEach",
        "dependsOn": [],
        "typeProperties": {
            "items": { "value": "@pipeline().parameters.items", "type": "Expression" },
            "activities": activities
        }
    })
}

/// Add a succeeded-dependency on `prerequisite` to an activity.
pub fn after(mut activity: Value, prerequisite: &str) -> Value {
    if let Some(Value::Array(entries)) = activity.get_mut("dependsOn") {
        entries.push(json!({ "activity": prerequisite, "dependencyConditions": ["Succeeded"] }));
    }
    activity
}
