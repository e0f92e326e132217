//! Tests for the `adfx` binary.

use adfx_cli::test_utils::fixtures::{TemplateBuilder, copy_activity, execute_pipeline};
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Command with an isolated home directory so no user configuration is read.
fn adfx(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("adfx").unwrap();
    cmd.env("HOME", home).env_remove("ADFX_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn write_template(dir: &Path, builder: TemplateBuilder) -> PathBuf {
    let path = dir.join("ARMTemplateForFactory.json");
    fs::write(&path, builder.build_string()).unwrap();
    path
}

fn clean_factory() -> TemplateBuilder {
    TemplateBuilder::new("MyFactory")
        .linked_service("LS", "AzureBlobStorage", None)
        .dataset("D1", "DelimitedText", "LS")
        .dataset("D2", "Parquet", "LS")
        .pipeline("A", vec![execute_pipeline("Run B", "B")])
        .pipeline("B", vec![copy_activity("Copy", "D1", "D2")])
        .trigger("T1", "Day", 1, &["A"])
}

#[test]
fn test_inspect_prints_summary() {
    let temp = TempDir::new().unwrap();
    let template = write_template(temp.path(), clean_factory());

    adfx(temp.path())
        .arg("inspect")
        .arg(&template)
        .args(["--tree", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MyFactory"))
        .stdout(predicate::str::contains("2 pipelines"))
        .stdout(predicate::str::contains("2 datasets"))
        .stdout(predicate::str::contains("trigger_fires_pipeline"))
        .stdout(predicate::str::contains("pipeline:B"))
        .stdout(predicate::str::contains("No warnings"));
}

#[test]
fn test_dump_emits_json_model() {
    let temp = TempDir::new().unwrap();
    let template = write_template(temp.path(), clean_factory());

    let output = adfx(temp.path()).arg("dump").arg(&template).arg("--pretty").output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["factory"]["name"], "MyFactory");
    assert_eq!(json["catalog"]["resources"].as_array().unwrap().len(), 6);
    assert!(json["warnings"].as_array().unwrap().is_empty());

    let edges = json["graph"]["edges"].as_array().unwrap();
    assert!(edges.iter().any(|e| e["kind"] == "pipeline_calls_pipeline"
        && e["source"]["name"] == "A"
        && e["target"]["name"] == "B"));
}

#[test]
fn test_deny_warnings_exits_with_two() {
    let temp = TempDir::new().unwrap();
    let template = write_template(
        temp.path(),
        TemplateBuilder::new("F").pipeline("A", vec![execute_pipeline("Run", "Missing")]),
    );

    // Warnings alone do not fail the run
    adfx(temp.path()).arg("dump").arg(&template).assert().success();

    adfx(temp.path())
        .arg("dump")
        .arg(&template)
        .arg("--deny-warnings")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("dangling_reference"))
        .stderr(predicate::str::contains("--deny-warnings"));

    adfx(temp.path())
        .arg("inspect")
        .arg(&template)
        .arg("--deny-warnings")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Missing"));
}

#[test]
fn test_malformed_template_exits_with_one() {
    let temp = TempDir::new().unwrap();
    let template = temp.path().join("broken.json");
    fs::write(&template, r#"{ "resources": { "not": "a list" } }"#).unwrap();

    adfx(temp.path())
        .arg("inspect")
        .arg(&template)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_json_exits_with_one() {
    let temp = TempDir::new().unwrap();
    let template = temp.path().join("broken.json");
    fs::write(&template, "{ \"resources\": [").unwrap();

    adfx(temp.path()).arg("dump").arg(&template).assert().code(1);
}

#[test]
fn test_missing_template_exits_with_one() {
    let temp = TempDir::new().unwrap();

    adfx(temp.path())
        .arg("inspect")
        .arg(temp.path().join("nope.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn test_config_file_changes_factory_parameter() {
    let temp = TempDir::new().unwrap();
    let template = write_template(
        temp.path(),
        TemplateBuilder::new("Default").parameter("dfName", "string", serde_json::json!("Renamed")),
    );
    let config = temp.path().join("adfx.toml");
    fs::write(&config, "factory_parameter = \"dfName\"\n").unwrap();

    let output = adfx(temp.path()).arg("--config").arg(&config).arg("dump").arg(&template).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["factory"]["name"], "Renamed");
}

#[test]
fn test_invalid_config_exits_with_one() {
    let temp = TempDir::new().unwrap();
    let template = write_template(temp.path(), clean_factory());
    let config = temp.path().join("adfx.toml");
    fs::write(&config, "unknown_key = true\n").unwrap();

    adfx(temp.path())
        .env("ADFX_CONFIG", &config)
        .arg("inspect")
        .arg(&template)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("adfx.toml"));
}
