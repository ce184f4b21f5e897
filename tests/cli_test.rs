//! CLI integration tests for the formwork binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("formwork"))
}

// Helper to create a temp model or value file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod check_command {
    use super::*;

    #[test]
    fn clean_model_passes() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(
            &dir,
            "model.json",
            r#"{
                "type": "object",
                "properties": {
                    "foo": {
                        "type": "string",
                        "endpoint": "${./bar}/api/",
                        "recordsPath": ""
                    },
                    "bar": { "type": "string" }
                }
            }"#,
        );

        cmd()
            .args(["check", model.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("all passed"));
    }

    #[test]
    fn bad_template_reports_e002() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(
            &dir,
            "model.json",
            r#"{
                "type": "object",
                "properties": {
                    "foo": { "type": "string", "endpoint": "${./bar/api/" }
                }
            }"#,
        );

        cmd()
            .args(["check", model.to_str().unwrap()])
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::contains("E002"));
    }

    #[test]
    fn undeclared_reference_reports_e003() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(
            &dir,
            "model.json",
            r#"{
                "type": "object",
                "properties": {
                    "foo": { "type": "string", "endpoint": "${./missing}/api/" }
                }
            }"#,
        );

        cmd()
            .args(["check", model.to_str().unwrap()])
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::contains("E003"));
    }

    #[test]
    fn missing_records_path_warns_but_passes() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(
            &dir,
            "model.json",
            r#"{
                "type": "object",
                "properties": {
                    "foo": { "type": "string", "endpoint": "/api/things/" }
                }
            }"#,
        );

        cmd()
            .args(["check", model.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("W001"));

        // strict promotes the warning to a failure
        cmd()
            .args(["check", model.to_str().unwrap(), "--strict"])
            .assert()
            .failure()
            .code(1);
    }

    #[test]
    fn json_format() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(
            &dir,
            "model.json",
            r#"{ "type": "object", "properties": {} }"#,
        );

        cmd()
            .args(["check", model.to_str().unwrap(), "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""files_checked""#));
    }

    #[test]
    fn missing_path_exits_2() {
        cmd()
            .args(["check", "/nonexistent/model.json"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod validate_command {
    use super::*;

    fn model_json() -> &'static str {
        r#"{
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "number" }
            }
        }"#
    }

    #[test]
    fn valid_value() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(&dir, "model.json", model_json());
        let value = write_temp_file(&dir, "value.json", r#"{"name": "Ada", "age": 36}"#);

        cmd()
            .args([
                "validate",
                value.to_str().unwrap(),
                "--model",
                model.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn invalid_value_exits_1() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(&dir, "model.json", model_json());
        let value = write_temp_file(&dir, "value.json", r#"{"age": "not a number"}"#);

        cmd()
            .args([
                "validate",
                value.to_str().unwrap(),
                "--model",
                model.to_str().unwrap(),
            ])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"));
    }

    #[test]
    fn json_output_lists_errors() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(&dir, "model.json", model_json());
        let value = write_temp_file(&dir, "value.json", r#"{}"#);

        cmd()
            .args([
                "validate",
                value.to_str().unwrap(),
                "--model",
                model.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains("#/name"));
    }

    #[test]
    fn blocked_dynamic_field_not_required() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(
            &dir,
            "model.json",
            r#"{
                "type": "object",
                "required": ["foo"],
                "properties": {
                    "foo": {
                        "type": "string",
                        "endpoint": "${./bar}/api/",
                        "recordsPath": ""
                    },
                    "bar": { "type": "string" }
                }
            }"#,
        );
        // bar is empty, so foo is blocked and its required error is waived
        let value = write_temp_file(&dir, "value.json", r#"{}"#);

        cmd()
            .args([
                "validate",
                value.to_str().unwrap(),
                "--model",
                model.to_str().unwrap(),
            ])
            .assert()
            .success();
    }

    #[test]
    fn missing_model_file_exits_3() {
        let dir = TempDir::new().unwrap();
        let value = write_temp_file(&dir, "value.json", r#"{}"#);

        cmd()
            .args([
                "validate",
                value.to_str().unwrap(),
                "--model",
                "/nonexistent/model.json",
            ])
            .assert()
            .failure()
            .code(3);
    }
}

mod sources_command {
    use super::*;

    fn model_json() -> &'static str {
        r#"{
            "type": "object",
            "properties": {
                "foo": {
                    "type": "string",
                    "endpoint": "${./bar}/api/",
                    "query": { "plan": "${./bar}" },
                    "recordsPath": ""
                },
                "bar": { "type": "string" }
            }
        }"#
    }

    #[test]
    fn blocked_without_value() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(&dir, "model.json", model_json());

        cmd()
            .args(["sources", model.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""status":"blocked""#))
            .stdout(predicate::str::contains("bar"));
    }

    #[test]
    fn resolved_with_value() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(&dir, "model.json", model_json());
        let value = write_temp_file(&dir, "value.json", r#"{"bar": "xyz"}"#);

        cmd()
            .args([
                "sources",
                model.to_str().unwrap(),
                "--value",
                value.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""status":"resolved""#))
            .stdout(predicate::str::contains("xyz/api/"));
    }

    #[test]
    fn pretty_output() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(&dir, "model.json", model_json());

        cmd()
            .args(["sources", model.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[\n"));
    }

    #[test]
    fn invalid_extension_exits_2() {
        let dir = TempDir::new().unwrap();
        let model = write_temp_file(
            &dir,
            "model.json",
            r#"{
                "type": "object",
                "properties": {
                    "foo": { "type": "string", "endpoint": 42 }
                }
            }"#,
        );

        cmd()
            .args(["sources", model.to_str().unwrap()])
            .assert()
            .failure()
            .code(2);
    }
}
