//! Expression resolution for ARM template strings.
//!
//! Names in exported factory templates are rarely literal. A pipeline is
//! declared as `[concat(parameters('factoryName'), '/PL_Load')]`, a dependency
//! as `[concat(variables('factoryId'), '/datasets/DS_Sales')]`, and activity
//! payloads are full of ADF runtime expressions such as
//! `@pipeline().parameters.TableName`. [`ExpressionResolver`] turns such
//! strings into the best literal text it can statically recover.
//!
//! # Resolution rules
//!
//! - Plain strings are returned unchanged ([`ResolutionStatus::Literal`]).
//! - `[...]` is an ARM template expression: `concat`, `parameters`,
//!   `variables`, `toLower` and `toUpper` are evaluated against the
//!   template's declarations. `[[` escapes a literal leading bracket.
//! - `@...` and `@{...}` are ADF runtime expressions. Runtime-only values
//!   (`pipeline()`, `activity()`, `item()`, ...) become sentinel placeholders
//!   like `<runtime:TableName>`; `@@` escapes a literal `@`.
//! - Anything unknown or malformed keeps the raw text and is flagged
//!   [`ResolutionStatus::Unresolved`]. Resolution never fails hard.
//!
//! # Examples
//!
//! ```rust
//! use adfx_cli::expression::{ExpressionResolver, ResolutionStatus};
//! use adfx_cli::template::Template;
//! use serde_json::json;
//!
//! let template = Template::from_value(json!({
//!     "parameters": { "factoryName": { "type": "string", "defaultValue": "MyFactory" } },
//!     "resources": []
//! })).unwrap();
//! let resolver = ExpressionResolver::new(&template);
//!
//! let resolved = resolver.resolve("[concat(parameters('factoryName'), '/Foo')]");
//! assert_eq!(resolved.value, "MyFactory/Foo");
//! assert_eq!(resolved.status, ResolutionStatus::Evaluated);
//!
//! let runtime = resolver.resolve("@pipeline().parameters.Table");
//! assert_eq!(runtime.value, "<runtime:Table>");
//! ```

pub mod parser;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::constants::{DEFAULT_RUNTIME_PREFIX, MAX_REFERENCE_DEPTH};
use crate::core::{Diagnostics, Warning};
use crate::template::Template;
use parser::{Expr, ParseError};

/// How a [`Resolution`] was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// No expression syntax; the input is the value.
    Literal,
    /// A template expression evaluated fully to static text.
    Evaluated,
    /// Evaluated, but some part is only known at run time and was replaced
    /// by a placeholder.
    Runtime,
    /// Evaluation failed; the value is the raw input.
    Unresolved { reason: String },
}

/// Result of resolving one template string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub value: String,
    #[serde(flatten)]
    pub status: ResolutionStatus,
}

impl Resolution {
    fn literal(raw: &str) -> Self {
        Self {
            value: raw.to_string(),
            status: ResolutionStatus::Literal,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.status, ResolutionStatus::Unresolved { .. })
    }

    pub fn is_runtime(&self) -> bool {
        self.status == ResolutionStatus::Runtime
    }

    /// True when the value is a static name that can be looked up.
    pub fn is_static(&self) -> bool {
        matches!(self.status, ResolutionStatus::Literal | ResolutionStatus::Evaluated)
    }

    pub fn unresolved_reason(&self) -> Option<&str> {
        match &self.status {
            ResolutionStatus::Unresolved { reason } => Some(reason),
            _ => None,
        }
    }
}

/// A name reference found in the template, with its resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Resolved name (raw text if unresolved)
    pub name: String,
    /// Text as written in the template
    pub raw: String,
    #[serde(flatten)]
    pub status: ResolutionStatus,
}

impl Reference {
    pub fn new(raw: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            name: resolution.value,
            raw: raw.into(),
            status: resolution.status,
        }
    }

    /// A reference whose name could not be read; `raw` is whatever JSON
    /// stood in its place and doubles as the name.
    pub fn unreadable(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            name: raw.clone(),
            raw,
            status: ResolutionStatus::Unresolved {
                reason: reason.into(),
            },
        }
    }

    /// True when the name is static and may be looked up in the catalog.
    pub fn is_static(&self) -> bool {
        matches!(self.status, ResolutionStatus::Literal | ResolutionStatus::Evaluated)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
enum EvalError {
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),
    #[error("unsupported function '{0}'")]
    UnknownFunction(String),
    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("function '{0}' expects a string argument")]
    ExpectedString(String),
    #[error("undeclared variable '{0}'")]
    UnknownVariable(String),
    #[error("'{0}' refers to itself")]
    ReferenceCycle(String),
    #[error("parameter/variable references nested too deeply")]
    TooDeep,
    #[error("property '{0}' not found")]
    MissingProperty(String),
    #[error("cannot index into {0}")]
    InvalidIndex(String),
    #[error("unterminated '@{{' interpolation")]
    UnterminatedInterpolation,
}

/// Which dialect an expression is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// `[...]` ARM deployment-time expression
    Template,
    /// `@...` ADF run-time expression
    Runtime,
}

/// Intermediate evaluation result.
#[derive(Debug, Clone)]
enum Eval {
    Json(Value),
    /// Run-time value, labelled by its most specific known name
    Runtime(String),
}

#[derive(Debug, Default)]
struct EvalState {
    saw_runtime: bool,
    /// `parameters:X` / `variables:Y` currently being expanded
    stack: Vec<String>,
}

/// Functions whose value only exists while a pipeline runs.
const RUNTIME_FUNCTIONS: &[&str] = &[
    "pipeline",
    "activity",
    "item",
    "trigger",
    "triggerbody",
    "triggeroutputs",
    "dataset",
    "linkedservice",
];

/// Resolves template strings against one template's parameters and variables.
///
/// Pure: resolving has no side effects, and the same input always yields the
/// same [`Resolution`].
#[derive(Debug, Clone)]
pub struct ExpressionResolver<'t> {
    template: &'t Template,
    runtime_prefix: String,
}

impl<'t> ExpressionResolver<'t> {
    pub fn new(template: &'t Template) -> Self {
        Self {
            template,
            runtime_prefix: DEFAULT_RUNTIME_PREFIX.to_string(),
        }
    }

    /// Use a different label for placeholders (`<{prefix}:NAME>`).
    #[must_use]
    pub fn with_runtime_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.runtime_prefix = prefix.into();
        self
    }

    /// Resolve a raw template string. Never fails; see [`ResolutionStatus`].
    pub fn resolve(&self, raw: &str) -> Resolution {
        let mut state = EvalState::default();
        match self.resolve_text(raw, &mut state) {
            Ok(None) => Resolution::literal(raw),
            Ok(Some(value)) => Resolution {
                value,
                status: if state.saw_runtime {
                    ResolutionStatus::Runtime
                } else {
                    ResolutionStatus::Evaluated
                },
            },
            Err(e) => {
                tracing::debug!("Could not resolve expression {raw:?}: {e}");
                Resolution {
                    value: raw.to_string(),
                    status: ResolutionStatus::Unresolved {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    /// Resolve and record an [`Warning::UnresolvableExpression`] on failure.
    pub fn resolve_reported(
        &self,
        raw: &str,
        context: impl FnOnce() -> String,
        diagnostics: &mut Diagnostics,
    ) -> Resolution {
        let resolution = self.resolve(raw);
        if let Some(reason) = resolution.unresolved_reason() {
            diagnostics.push(Warning::UnresolvableExpression {
                context: context(),
                raw: raw.to_string(),
                reason: reason.to_string(),
            });
        }
        resolution
    }

    /// Resolve a name-bearing JSON value into a [`Reference`].
    ///
    /// Accepts a plain string or an ADF expression object
    /// (`{"value": "@...", "type": "Expression"}`). Returns `None` for
    /// anything else.
    pub fn reference(
        &self,
        value: &Value,
        context: impl FnOnce() -> String,
        diagnostics: &mut Diagnostics,
    ) -> Option<Reference> {
        let raw = match value {
            Value::String(s) => s.as_str(),
            Value::Object(map) => map.get("value")?.as_str()?,
            _ => return None,
        };
        let resolution = self.resolve_reported(raw, context, diagnostics);
        Some(Reference::new(raw, resolution))
    }

    /// Resolve the `referenceName` of an ADF reference object such as
    /// `{"referenceName": "LS_Sql", "type": "LinkedServiceReference"}`.
    pub fn named_reference(
        &self,
        reference: &Value,
        context: impl FnOnce() -> String,
        diagnostics: &mut Diagnostics,
    ) -> Option<Reference> {
        self.reference(reference.get("referenceName")?, context, diagnostics)
    }

    /// Resolve each argument of a bracketed `concat(...)` on its own.
    ///
    /// Returns `None` when `raw` is not such an expression. An argument that
    /// does not evaluate comes back unresolved with its source text as value.
    pub fn resolve_segments(&self, raw: &str) -> Option<Vec<Resolution>> {
        let body = raw.strip_prefix('[')?.strip_suffix(']')?;
        if body.starts_with('[') {
            return None;
        }
        let Ok(Expr::Call {
            name,
            args,
        }) = parser::parse(body)
        else {
            return None;
        };
        if !name.eq_ignore_ascii_case("concat") {
            return None;
        }

        let segments = args
            .iter()
            .map(|arg| {
                let mut state = EvalState::default();
                match self.eval(arg, Mode::Template, &mut state) {
                    Ok(value) => Resolution {
                        value: self.to_text(&value),
                        status: if state.saw_runtime {
                            ResolutionStatus::Runtime
                        } else {
                            ResolutionStatus::Evaluated
                        },
                    },
                    Err(e) => Resolution {
                        value: arg.to_string(),
                        status: ResolutionStatus::Unresolved {
                            reason: e.to_string(),
                        },
                    },
                }
            })
            .collect();
        Some(segments)
    }

    /// Resolve a string to text, or `Ok(None)` if it holds no expression.
    fn resolve_text(&self, raw: &str, state: &mut EvalState) -> Result<Option<String>, EvalError> {
        if let Some(rest) = raw.strip_prefix("[[") {
            return Ok(Some(format!("[{rest}")));
        }
        if let Some(body) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let expr = parser::parse(body)?;
            let value = self.eval(&expr, Mode::Template, state)?;
            return Ok(Some(self.to_text(&value)));
        }
        if let Some(rest) = raw.strip_prefix("@@") {
            return Ok(Some(format!("@{rest}")));
        }
        if raw.contains("@{") {
            return self.interpolate(raw, state).map(Some);
        }
        if let Some(body) = raw.strip_prefix('@') {
            let expr = parser::parse(body)?;
            let value = self.eval(&expr, Mode::Runtime, state)?;
            return Ok(Some(self.to_text(&value)));
        }
        Ok(None)
    }

    /// Expand every `@{...}` segment of an interpolated string.
    fn interpolate(&self, raw: &str, state: &mut EvalState) -> Result<String, EvalError> {
        let mut output = String::new();
        let mut rest = raw;

        while let Some(start) = rest.find("@{") {
            output.push_str(&rest[..start]);
            let body_start = start + 2;
            let body_len =
                closing_brace(&rest[body_start..]).ok_or(EvalError::UnterminatedInterpolation)?;
            let expr = parser::parse(&rest[body_start..body_start + body_len])?;
            let value = self.eval(&expr, Mode::Runtime, state)?;
            output.push_str(&self.to_text(&value));
            rest = &rest[body_start + body_len + 1..];
        }

        output.push_str(rest);
        Ok(output)
    }

    fn eval(&self, expr: &Expr, mode: Mode, state: &mut EvalState) -> Result<Eval, EvalError> {
        match expr {
            Expr::Str(text) => Ok(Eval::Json(Value::String(text.clone()))),
            Expr::Int(n) => Ok(Eval::Json(Value::from(*n))),
            Expr::Call {
                name,
                args,
            } => self.eval_call(name, args, mode, state),
            Expr::Member {
                base,
                property,
            } => match self.eval(base, mode, state)? {
                Eval::Runtime(_) => Ok(Eval::Runtime(property.clone())),
                Eval::Json(Value::Object(map)) => lookup_property(&map, property)
                    .cloned()
                    .map(Eval::Json)
                    .ok_or_else(|| EvalError::MissingProperty(property.clone())),
                Eval::Json(_) => Err(EvalError::MissingProperty(property.clone())),
            },
            Expr::Index {
                base,
                index,
            } => {
                let base = self.eval(base, mode, state)?;
                let index = self.eval(index, mode, state)?;
                match (base, index) {
                    (Eval::Runtime(_), index) | (Eval::Json(_), index @ Eval::Runtime(_)) => {
                        Ok(Eval::Runtime(self.label(&index)))
                    }
                    (Eval::Json(Value::Array(items)), Eval::Json(Value::Number(n))) => n
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| items.get(i).cloned())
                        .map(Eval::Json)
                        .ok_or_else(|| EvalError::InvalidIndex(format!("array at {n}"))),
                    (Eval::Json(Value::Object(map)), Eval::Json(Value::String(key))) => {
                        lookup_property(&map, &key)
                            .cloned()
                            .map(Eval::Json)
                            .ok_or(EvalError::MissingProperty(key))
                    }
                    (Eval::Json(other), _) => Err(EvalError::InvalidIndex(json_kind(&other).to_string())),
                }
            }
        }
    }

    fn eval_call(
        &self,
        name: &str,
        args: &[Expr],
        mode: Mode,
        state: &mut EvalState,
    ) -> Result<Eval, EvalError> {
        let function = name.to_ascii_lowercase();

        if RUNTIME_FUNCTIONS.contains(&function.as_str())
            || (function == "variables" && mode == Mode::Runtime)
        {
            state.saw_runtime = true;
            let label = match args.first() {
                Some(arg) => {
                    let value = self.eval(arg, mode, state)?;
                    self.label(&value)
                }
                None => name.to_string(),
            };
            return Ok(Eval::Runtime(label));
        }

        match function.as_str() {
            "concat" => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg, mode, state))
                    .collect::<Result<Vec<_>, _>>()?;
                let all_arrays =
                    !values.is_empty() && values.iter().all(|v| matches!(v, Eval::Json(Value::Array(_))));
                if all_arrays {
                    let merged = values
                        .into_iter()
                        .flat_map(|v| match v {
                            Eval::Json(Value::Array(items)) => items,
                            _ => Vec::new(),
                        })
                        .collect();
                    return Ok(Eval::Json(Value::Array(merged)));
                }
                let text: String = values.iter().map(|v| self.to_text(v)).collect();
                Ok(Eval::Json(Value::String(text)))
            }
            "tolower" | "toupper" => {
                let text = match self.single_argument(name, args, mode, state)? {
                    runtime @ Eval::Runtime(_) => return Ok(runtime),
                    value => self.to_text(&value),
                };
                let converted =
                    if function == "tolower" { text.to_lowercase() } else { text.to_uppercase() };
                Ok(Eval::Json(Value::String(converted)))
            }
            "parameters" if mode == Mode::Template => {
                let key = self.string_argument(name, args, mode, state)?;
                self.parameter_value(&key, state)
            }
            "variables" => {
                let key = self.string_argument(name, args, mode, state)?;
                self.variable_value(&key, state)
            }
            _ if mode == Mode::Runtime => {
                // Any other ADF function (utcnow, formatDateTime, ...) only
                // has a value at run time.
                state.saw_runtime = true;
                Ok(Eval::Runtime(name.to_string()))
            }
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }

    fn single_argument(
        &self,
        name: &str,
        args: &[Expr],
        mode: Mode,
        state: &mut EvalState,
    ) -> Result<Eval, EvalError> {
        match args {
            [arg] => self.eval(arg, mode, state),
            _ => Err(EvalError::Arity {
                name: name.to_string(),
                expected: 1,
                found: args.len(),
            }),
        }
    }

    fn string_argument(
        &self,
        name: &str,
        args: &[Expr],
        mode: Mode,
        state: &mut EvalState,
    ) -> Result<String, EvalError> {
        match self.single_argument(name, args, mode, state)? {
            Eval::Json(Value::String(s)) => Ok(s),
            _ => Err(EvalError::ExpectedString(name.to_string())),
        }
    }

    /// Default value of a template parameter, or its name when it has none.
    fn parameter_value(&self, name: &str, state: &mut EvalState) -> Result<Eval, EvalError> {
        let Some(parameter) = self.template.parameter(name) else {
            tracing::debug!("Parameter '{name}' is not declared; using its name");
            return Ok(Eval::Json(Value::String(name.to_string())));
        };
        match &parameter.default_value {
            None | Some(Value::Null) => Ok(Eval::Json(Value::String(name.to_string()))),
            Some(Value::String(text)) => {
                self.expand_nested(&format!("parameters:{name}"), text, state)
            }
            Some(other) => Ok(Eval::Json(other.clone())),
        }
    }

    fn variable_value(&self, name: &str, state: &mut EvalState) -> Result<Eval, EvalError> {
        match self.template.variable(name) {
            None => Err(EvalError::UnknownVariable(name.to_string())),
            Some(Value::String(text)) => {
                self.expand_nested(&format!("variables:{name}"), text, state)
            }
            Some(other) => Ok(Eval::Json(other.clone())),
        }
    }

    /// Evaluate a declaration value that may itself be an ARM expression.
    fn expand_nested(&self, key: &str, text: &str, state: &mut EvalState) -> Result<Eval, EvalError> {
        if state.stack.iter().any(|k| k == key) {
            return Err(EvalError::ReferenceCycle(key.to_string()));
        }
        if state.stack.len() >= MAX_REFERENCE_DEPTH {
            return Err(EvalError::TooDeep);
        }

        if let Some(rest) = text.strip_prefix("[[") {
            return Ok(Eval::Json(Value::String(format!("[{rest}"))));
        }
        let Some(body) = text.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
            return Ok(Eval::Json(Value::String(text.to_string())));
        };

        state.stack.push(key.to_string());
        let result = parser::parse(body)
            .map_err(EvalError::from)
            .and_then(|expr| self.eval(&expr, Mode::Template, state));
        state.stack.pop();
        result
    }

    fn placeholder(&self, label: &str) -> String {
        format!("<{}:{}>", self.runtime_prefix, label)
    }

    fn label(&self, value: &Eval) -> String {
        match value {
            Eval::Runtime(label) => label.clone(),
            Eval::Json(_) => self.to_text(value),
        }
    }

    fn to_text(&self, value: &Eval) -> String {
        match value {
            Eval::Runtime(label) => self.placeholder(label),
            Eval::Json(Value::String(s)) => s.clone(),
            Eval::Json(Value::Null) => String::new(),
            Eval::Json(other) => other.to_string(),
        }
    }
}

/// ARM property access is case-insensitive.
fn lookup_property<'v>(map: &'v serde_json::Map<String, Value>, key: &str) -> Option<&'v Value> {
    map.get(key)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Byte length up to the `}` closing an interpolation, skipping quoted text.
fn closing_brace(body: &str) -> Option<usize> {
    let mut in_string = false;
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' if in_string && chars.peek().is_some_and(|(_, n)| *n == '\'') => {
                chars.next();
            }
            '\'' => in_string = !in_string,
            '}' if !in_string => return Some(i),
            _ => {}
        }
    }
    None
}
