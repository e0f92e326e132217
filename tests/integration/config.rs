//! Configuration lookup through the `ADFX_CONFIG` environment variable.
//!
//! These tests mutate process-wide environment and run serially.

use adfx_cli::config::AnalysisConfig;
use adfx_cli::core::AdfError;
use serial_test::serial;
use std::ffi::OsStr;
use tempfile::TempDir;
use tokio::fs;

/// Sets a variable for the lifetime of the guard.
struct EnvGuard {
    key: &'static str,
    previous: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        let previous = std::env::var_os(key);
        // SAFETY: tests touching the environment are #[serial]
        unsafe { std::env::set_var(key, value) };
        Self { key, previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: see EnvGuard::set
        unsafe {
            match &self.previous {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }
}

#[tokio::test]
#[serial]
async fn test_env_var_selects_config_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("adfx.toml");
    fs::write(&path, "runtime_placeholder_prefix = \"param\"\nsuggest_similar = false\n").await.unwrap();
    let _guard = EnvGuard::set("ADFX_CONFIG", &path);

    let config = AnalysisConfig::load().await.unwrap();
    assert_eq!(config.runtime_placeholder_prefix, "param");
    assert!(!config.suggest_similar);
    assert_eq!(config.factory_parameter, "factoryName");
}

#[tokio::test]
#[serial]
async fn test_explicit_path_wins_over_env_var() {
    let temp = TempDir::new().unwrap();
    let from_env = temp.path().join("env.toml");
    let explicit = temp.path().join("explicit.toml");
    fs::write(&from_env, "factory_parameter = \"fromEnv\"").await.unwrap();
    fs::write(&explicit, "factory_parameter = \"explicit\"").await.unwrap();
    let _guard = EnvGuard::set("ADFX_CONFIG", &from_env);

    let config = AnalysisConfig::load_with_optional(Some(explicit)).await.unwrap();
    assert_eq!(config.factory_parameter, "explicit");
}

#[tokio::test]
#[serial]
async fn test_env_var_pointing_nowhere_is_an_error() {
    let temp = TempDir::new().unwrap();
    let _guard = EnvGuard::set("ADFX_CONFIG", temp.path().join("missing.toml"));

    let err = AnalysisConfig::load().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<AdfError>(), Some(AdfError::ConfigNotFound { .. })));
}

#[tokio::test]
#[serial]
async fn test_defaults_without_any_file() {
    let temp = TempDir::new().unwrap();
    let _config = EnvGuard::set("ADFX_CONFIG", "");
    let _home = EnvGuard::set("HOME", temp.path());

    let config = AnalysisConfig::load().await.unwrap();
    assert_eq!(config, AnalysisConfig::default());
}
