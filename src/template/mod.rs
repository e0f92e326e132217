//! ARM template root document.
//!
//! [`Template`] is the validated, read-only view of an exported factory
//! template: its declared parameters and variables, and the ordered list of
//! raw resource entries. Structural checks happen here, once, so that the
//! rest of the pipeline can assume every resource has a `type` and a `name`.
//!
//! # Examples
//!
//! ```rust
//! use adfx_cli::template::Template;
//! use serde_json::json;
//!
//! let template = Template::from_value(json!({
//!     "parameters": { "factoryName": { "type": "string", "defaultValue": "MyFactory" } },
//!     "resources": [{
//!         "name": "[concat(parameters('factoryName'), '/PL_Load')]",
//!         "type": "Microsoft.DataFactory/factories/pipelines",
//!         "properties": { "activities": [] }
//!     }]
//! })).unwrap();
//!
//! assert_eq!(template.resources().len(), 1);
//! assert!(template.parameter("factoryName").is_some());
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

use crate::core::AdfError;

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateParameter {
    pub name: String,
    /// Declared ARM type (`string`, `secureString`, `int`, ...)
    #[serde(rename = "type")]
    pub param_type: Option<String>,
    pub default_value: Option<Value>,
}

/// One entry of the template's `resources` array.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResource {
    /// Position in the `resources` array
    pub index: usize,
    /// Declared `name`, usually an expression
    pub name: String,
    /// Declared `type`, e.g. `Microsoft.DataFactory/factories/datasets`
    pub arm_type: String,
    /// The `properties` object, `Value::Null` when absent
    pub properties: Value,
    /// ARM-level `dependsOn` entries (resource id expressions)
    pub depends_on: Vec<String>,
}

/// Validated template document.
#[derive(Debug, Clone, Default)]
pub struct Template {
    content_version: Option<String>,
    parameters: Vec<TemplateParameter>,
    parameter_index: HashMap<String, usize>,
    variables: HashMap<String, Value>,
    resources: Vec<RawResource>,
}

impl Template {
    /// Build a template from a decoded JSON document.
    ///
    /// # Errors
    ///
    /// [`AdfError::MalformedTemplate`] when the root is not an object, has no
    /// `resources` array, or a resource entry lacks a string `type` or `name`.
    pub fn from_value(document: Value) -> Result<Self, AdfError> {
        let Value::Object(mut root) = document else {
            return Err(malformed("the document root is not a JSON object"));
        };

        let resources = match root.remove("resources") {
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(malformed("'resources' is not an array")),
            None => return Err(malformed("missing top-level 'resources' array")),
        };

        let parameters = match root.get("parameters") {
            Some(Value::Object(map)) => parse_parameters(map),
            _ => Vec::new(),
        };
        let parameter_index =
            parameters.iter().enumerate().map(|(i, p)| (p.name.clone(), i)).collect();

        let variables = match root.remove("variables") {
            Some(Value::Object(map)) => map.into_iter().collect(),
            _ => HashMap::new(),
        };

        let resources = resources
            .into_iter()
            .enumerate()
            .map(|(index, entry)| parse_resource(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Loaded template with {} parameter(s), {} variable(s), {} resource(s)",
            parameters.len(),
            variables.len(),
            resources.len()
        );

        Ok(Self {
            content_version: root.get("contentVersion").and_then(Value::as_str).map(String::from),
            parameters,
            parameter_index,
            variables,
            resources,
        })
    }

    /// Parse template text.
    ///
    /// # Errors
    ///
    /// [`AdfError::JsonError`] for invalid JSON, otherwise as [`Template::from_value`].
    pub fn from_json_str(text: &str) -> Result<Self, AdfError> {
        let document: Value = serde_json::from_str(text)?;
        Self::from_value(document)
    }

    /// Read and parse a template file.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AdfError::TemplateNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read template file: {}", path.display()))?;

        let document: Value =
            serde_json::from_str(&text).map_err(|e| AdfError::TemplateParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Self::from_value(document).map_err(Into::into)
    }

    pub fn content_version(&self) -> Option<&str> {
        self.content_version.as_deref()
    }

    /// Declared parameters, in document order.
    pub fn parameters(&self) -> &[TemplateParameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&TemplateParameter> {
        self.parameter_index.get(name).map(|&i| &self.parameters[i])
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn resources(&self) -> &[RawResource] {
        &self.resources
    }
}

fn malformed(reason: impl Into<String>) -> AdfError {
    AdfError::MalformedTemplate {
        reason: reason.into(),
    }
}

fn parse_parameters(map: &Map<String, Value>) -> Vec<TemplateParameter> {
    map.iter()
        .map(|(name, declaration)| TemplateParameter {
            name: name.clone(),
            param_type: declaration.get("type").and_then(Value::as_str).map(String::from),
            default_value: declaration.get("defaultValue").cloned(),
        })
        .collect()
}

fn parse_resource(index: usize, entry: Value) -> Result<RawResource, AdfError> {
    let Value::Object(mut object) = entry else {
        return Err(malformed(format!("resource #{index} is not a JSON object")));
    };

    let arm_type = match object.get("type") {
        Some(Value::String(t)) if !t.trim().is_empty() => t.clone(),
        _ => return Err(malformed(format!("resource #{index} has no 'type'"))),
    };
    let name = match object.get("name") {
        Some(Value::String(n)) if !n.trim().is_empty() => n.clone(),
        _ => return Err(malformed(format!("resource #{index} ({arm_type}) has no 'name'"))),
    };

    let depends_on = match object.get("dependsOn") {
        Some(Value::Array(items)) => {
            items.iter().filter_map(Value::as_str).map(String::from).collect()
        }
        _ => Vec::new(),
    };

    Ok(RawResource {
        index,
        name,
        arm_type,
        properties: object.remove("properties").unwrap_or(Value::Null),
        depends_on,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_reads_parameters_and_resources() {
        let template = Template::from_value(json!({
            "contentVersion": "1.0.0.0",
            "parameters": {
                "factoryName": { "type": "string", "defaultValue": "MyFactory" },
                "retries": { "type": "int" }
            },
            "variables": { "factoryId": "[concat('Microsoft.DataFactory/factories/', parameters('factoryName'))]" },
            "resources": [
                {
                    "name": "[concat(parameters('factoryName'), '/DS1')]",
                    "type": "Microsoft.DataFactory/factories/datasets",
                    "dependsOn": ["[concat(variables('factoryId'), '/linkedServices/LS1')]"],
                    "properties": { "type": "AzureSqlTable" }
                }
            ]
        }))
        .unwrap();

        assert_eq!(template.content_version(), Some("1.0.0.0"));
        assert_eq!(template.parameters().len(), 2);
        assert_eq!(template.parameter("factoryName").unwrap().default_value, Some(json!("MyFactory")));
        assert_eq!(template.parameter("retries").unwrap().default_value, None);
        assert!(template.variable("factoryId").is_some());

        let resource = &template.resources()[0];
        assert_eq!(resource.index, 0);
        assert_eq!(resource.arm_type, "Microsoft.DataFactory/factories/datasets");
        assert_eq!(resource.depends_on.len(), 1);
        assert_eq!(resource.properties["type"], "AzureSqlTable");
    }

    #[test]
    fn test_missing_resources_is_malformed() {
        let err = Template::from_value(json!({ "parameters": {} })).unwrap_err();
        assert!(matches!(err, AdfError::MalformedTemplate { .. }));
        assert!(err.to_string().contains("resources"));
    }

    #[test]
    fn test_non_object_root_is_malformed() {
        let err = Template::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, AdfError::MalformedTemplate { .. }));
    }

    #[test]
    fn test_resource_without_type_is_malformed() {
        let err = Template::from_value(json!({
            "resources": [{ "name": "x" }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("resource #0 has no 'type'"));
    }

    #[test]
    fn test_resource_without_name_is_malformed() {
        let err = Template::from_value(json!({
            "resources": [
                { "name": "ok", "type": "Microsoft.DataFactory/factories/pipelines" },
                { "type": "Microsoft.DataFactory/factories/pipelines" }
            ]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("resource #1"));
    }

    #[test]
    fn test_empty_resources_is_valid() {
        let template = Template::from_value(json!({ "resources": [] })).unwrap();
        assert!(template.resources().is_empty());
    }

    #[test]
    fn test_from_json_str_reports_invalid_json() {
        let err = Template::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, AdfError::JsonError(_)));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = Template::load(Path::new("/definitely/not/here.json")).await.unwrap_err();
        assert!(err.downcast_ref::<AdfError>().is_some());
    }
}
