//! Analysis configuration.
//!
//! ADFX works without any configuration. A TOML file can adjust how templates
//! are interpreted:
//!
//! ```toml
//! # Parameter whose default names the factory
//! factory_parameter = "factoryName"
//!
//! # Runtime-only values render as <runtime:NAME>
//! runtime_placeholder_prefix = "runtime"
//!
//! # Keep data flows, credentials and other unrecognized resource types
//! keep_other_resources = true
//!
//! # Offer "did you mean" hints for dangling references
//! suggest_similar = true
//! ```
//!
//! # Lookup order
//!
//! 1. `--config <PATH>` on the command line (must exist)
//! 2. The `ADFX_CONFIG` environment variable (must exist)
//! 3. `~/.adfx/config.toml` (`%LOCALAPPDATA%\adfx\config.toml` on Windows), if present
//! 4. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::constants::{CONFIG_ENV_VAR, DEFAULT_FACTORY_PARAMETER, DEFAULT_RUNTIME_PREFIX};
use crate::core::AdfError;

/// Settings that influence one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub factory_parameter: String,
    pub runtime_placeholder_prefix: String,
    pub keep_other_resources: bool,
    pub suggest_similar: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            factory_parameter: DEFAULT_FACTORY_PARAMETER.to_string(),
            runtime_placeholder_prefix: DEFAULT_RUNTIME_PREFIX.to_string(),
            keep_other_resources: true,
            suggest_similar: true,
        }
    }
}

impl AnalysisConfig {
    /// Load from the default location, falling back to defaults.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from an explicit path, the `ADFX_CONFIG` variable, or the default
    /// location, in that order.
    ///
    /// # Errors
    ///
    /// An explicitly named file (argument or environment) that does not
    /// exist, or any file that cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let explicit = path.or_else(|| {
            std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()).map(PathBuf::from)
        });

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(AdfError::ConfigNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            return Self::load_from(&path).await;
        }

        match Self::default_path() {
            Ok(path) if path.exists() => Self::load_from(&path).await,
            Ok(_) => Ok(Self::default()),
            Err(e) => {
                tracing::debug!("No default configuration location: {e}");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| AdfError::ConfigParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AdfError> {
        if self.factory_parameter.trim().is_empty() {
            return Err(AdfError::ConfigError {
                message: "factory_parameter must not be empty".to_string(),
            });
        }
        if self.runtime_placeholder_prefix.trim().is_empty() {
            return Err(AdfError::ConfigError {
                message: "runtime_placeholder_prefix must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// `~/.adfx/config.toml`, or `%LOCALAPPDATA%\adfx\config.toml` on Windows.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("adfx")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".adfx")
        };

        Ok(config_dir.join("config.toml"))
    }
}
