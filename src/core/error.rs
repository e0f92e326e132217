//! Error handling for ADFX
//!
//! ADFX separates two very different classes of problems:
//! 1. **Fatal errors** ([`AdfError`]) - the input cannot be analyzed at all, for
//!    example the document has no `resources` array or a resource has no `type`.
//! 2. **Warnings** ([`Warning`](super::Warning)) - data-quality findings that degrade the
//!    model without stopping it (unresolved expressions, duplicate names,
//!    dangling references). Those live in [`super::diagnostic`].
//!
//! Fatal errors can be wrapped in an [`ErrorContext`] that adds a suggestion
//! and details for display in the terminal.
//!
//! # Examples
//!
//! ```rust,no_run
//! use adfx_cli::core::{AdfError, ErrorContext, user_friendly_error};
//!
//! let error = AdfError::MalformedTemplate {
//!     reason: "missing 'resources' array".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for ADFX operations
///
/// Only [`AdfError::MalformedTemplate`] is raised by the analysis core; the
/// remaining variants cover reading the template and the configuration.
#[derive(Error, Debug)]
pub enum AdfError {
    /// The template lacks the structure every extraction step relies on.
    #[error("Malformed template: {reason}")]
    MalformedTemplate {
        /// What is missing or has the wrong shape
        reason: String,
    },

    /// The template file is not valid JSON.
    #[error("Invalid template JSON in {file}")]
    TemplateParseError {
        /// Path of the template file
        file: String,
        /// Decoder message
        reason: String,
    },

    /// The template file does not exist.
    #[error("Template file not found: {path}")]
    TemplateNotFound {
        /// Path that was looked up
        path: String,
    },

    /// Configuration semantics are invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// The configuration file does not parse.
    #[error("Invalid configuration file syntax in {file}")]
    ConfigParseError {
        /// Path of the configuration file
        file: String,
        /// Parser message
        reason: String,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was looked up
        path: String,
    },

    /// Unknown resource kind label.
    #[error("Invalid resource kind: {kind}")]
    InvalidResourceKind {
        /// Label that failed to parse
        kind: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for AdfError {
    fn clone(&self) -> Self {
        match self {
            Self::MalformedTemplate {
                reason,
            } => Self::MalformedTemplate {
                reason: reason.clone(),
            },
            Self::TemplateParseError {
                file,
                reason,
            } => Self::TemplateParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::TemplateNotFound {
                path,
            } => Self::TemplateNotFound {
                path: path.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::ConfigParseError {
                file,
                reason,
            } => Self::ConfigParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ConfigNotFound {
                path,
            } => Self::ConfigNotFound {
                path: path.clone(),
            },
            Self::InvalidResourceKind {
                kind,
            } => Self::InvalidResourceKind {
                kind: kind.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::JsonError(e) => Self::Other {
                message: format!("JSON parsing error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// When displayed, errors show the main message in red, optional details in
/// yellow and an optional suggestion in green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying ADFX error
    pub error: AdfError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: AdfError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`AdfError`] (possibly buried in an `anyhow` context chain),
/// [`std::io::Error`], [`serde_json::Error`] and [`toml::de::Error`]; anything
/// else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(adf_error) = error.chain().find_map(|e| e.downcast_ref::<AdfError>()) {
        return create_error_context(adf_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(AdfError::Other {
                    message: format!("Permission denied: {error}"),
                })
                .with_suggestion("Check the file permissions of the template and configuration files");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(AdfError::Other {
                    message: format!("{error}"),
                })
                .with_suggestion("Check that the file exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return ErrorContext::new(AdfError::TemplateParseError {
            file: "template".to_string(),
            reason: json_error.to_string(),
        })
        .with_suggestion("Make sure the file is an exported ARM template (ARMTemplateForFactory.json)")
        .with_details(format!("JSON decoder reported: {json_error}"));
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(AdfError::ConfigParseError {
            file: "config.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the configuration file");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(AdfError::Other {
        message,
    })
}

/// Map each [`AdfError`] variant to a context with tailored suggestions.
fn create_error_context(error: AdfError) -> ErrorContext {
    match &error {
        AdfError::MalformedTemplate { reason } => ErrorContext::new(error.clone())
            .with_suggestion("Export the factory again with 'Export ARM template' and pass ARMTemplateForFactory.json")
            .with_details(format!(
                "The document cannot be analyzed because {reason}. Only this class of problem aborts the run"
            )),

        AdfError::TemplateParseError { file, reason } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Check that {file} is complete, valid JSON"))
            .with_details(reason.clone()),

        AdfError::TemplateNotFound { path } => ErrorContext::new(error.clone())
            .with_suggestion("Pass the path of ARMTemplateForFactory.json, not its directory")
            .with_details(format!("Nothing exists at {path}")),

        AdfError::ConfigParseError { file, reason } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check the TOML syntax in {file}. Common issues: missing quotes, unknown keys"
            ))
            .with_details(reason.clone()),

        AdfError::ConfigNotFound { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Create the file or unset ADFX_CONFIG to use the defaults"),

        _ => ErrorContext::new(error.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_display() {
        let error = AdfError::MalformedTemplate {
            reason: "missing 'resources' array".to_string(),
        };
        assert_eq!(error.to_string(), "Malformed template: missing 'resources' array");
    }

    #[test]
    fn test_error_context_display() {
        let context = ErrorContext::new(AdfError::Other {
            message: "boom".to_string(),
        })
        .with_details("some details")
        .with_suggestion("try again");

        let rendered = context.to_string();
        assert!(rendered.contains("boom"));
        assert!(rendered.contains("Details: some details"));
        assert!(rendered.contains("Suggestion: try again"));
    }

    #[test]
    fn test_user_friendly_error_malformed_template() {
        let error = AdfError::MalformedTemplate {
            reason: "resource #0 has no 'type'".to_string(),
        };
        let ctx = user_friendly_error(anyhow::Error::from(error));
        assert!(matches!(ctx.error, AdfError::MalformedTemplate { .. }));
        assert!(ctx.suggestion.is_some());
        assert!(ctx.details.unwrap().contains("resource #0"));
    }

    #[test]
    fn test_user_friendly_error_finds_adf_error_behind_context() {
        let result: anyhow::Result<()> = Err(AdfError::TemplateNotFound {
            path: "missing.json".to_string(),
        })
        .context("Failed to load template");
        let ctx = user_friendly_error(result.unwrap_err());
        assert!(matches!(ctx.error, AdfError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_user_friendly_error_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let ctx = user_friendly_error(anyhow::Error::from(json_error));
        assert!(matches!(ctx.error, AdfError::TemplateParseError { .. }));
    }

    #[test]
    fn test_user_friendly_error_generic_includes_chain() {
        let error = anyhow::anyhow!("root cause").context("outer");
        let ctx = user_friendly_error(error);
        let message = ctx.error.to_string();
        assert!(message.contains("outer"));
        assert!(message.contains("Caused by:"));
        assert!(message.contains("root cause"));
    }

    #[test]
    fn test_error_clone_converts_io_to_other() {
        let io = AdfError::IoError(std::io::Error::other("disk"));
        match io.clone() {
            AdfError::Other { message } => assert!(message.contains("disk")),
            other => panic!("unexpected clone result: {other:?}"),
        }
    }
}
