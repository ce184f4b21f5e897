//! Model linting - static analysis of form model files.
//!
//! Validates model files for:
//! - JSON syntax errors
//! - Broken `${...}` templates in endpoint/query extensions
//! - References to fields the model does not declare
//! - Invalid extension value types

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::ModelError;
use crate::loader::load_json;
use crate::model::DynamicSourceSpec;
use crate::path::{FieldPath, Segment};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/properties/foo/endpoint")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a model file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_model_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single model file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();

    // Try to load the file (checks syntax)
    let model = match load_json(file) {
        Ok(m) => m,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E001".to_string(),
                file: file.to_path_buf(),
                path: "/".to_string(),
                message: format!("syntax error: {}", e),
            });
            return FileResult {
                file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    check_model(&model, file, &mut diagnostics);

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// Run all checks against a loaded model.
fn check_model(model: &Value, file: &Path, diagnostics: &mut Vec<Diagnostic>) {
    if model.get("type").is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "W002".to_string(),
            file: file.to_path_buf(),
            path: "/".to_string(),
            message: "model missing top-level type".to_string(),
        });
    }

    check_properties(model, model, &FieldPath::root(), "", file, diagnostics);
}

fn check_properties(
    model: &Value,
    schema: &Value,
    field: &FieldPath,
    schema_path: &str,
    file: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(props) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };

    for (name, prop) in props {
        let child_field = field.child_key(name);
        let child_path = format!("{}/properties/{}", schema_path, name);

        match DynamicSourceSpec::from_property(prop, &child_path) {
            Ok(Some(spec)) => {
                check_references(model, &spec, &child_field, &child_path, file, diagnostics);
                if prop.get("recordsPath").is_none() {
                    diagnostics.push(Diagnostic {
                        severity: Severity::Warning,
                        code: "W001".to_string(),
                        file: file.to_path_buf(),
                        path: format!("{}/endpoint", child_path),
                        message: "endpoint without recordsPath: the whole response is treated \
                                  as the record array"
                            .to_string(),
                    });
                }
            }
            Ok(None) => {}
            Err(e) => diagnostics.push(diagnostic_for_model_error(&e, file)),
        }

        check_properties(model, prop, &child_field, &child_path, file, diagnostics);
    }
}

fn check_references(
    model: &Value,
    spec: &DynamicSourceSpec,
    field: &FieldPath,
    schema_path: &str,
    file: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut referenced = spec.endpoint.referenced_paths(field);
    for template in spec.query.values() {
        referenced.extend(template.referenced_paths(field));
    }

    for reference in referenced {
        if !declares_path(model, &reference) {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E003".to_string(),
                file: file.to_path_buf(),
                path: schema_path.to_string(),
                message: format!("reference to undeclared field \"{}\"", reference),
            });
        }
    }
}

fn diagnostic_for_model_error(error: &ModelError, file: &Path) -> Diagnostic {
    let (code, path) = match error {
        ModelError::InvalidTemplate { path, .. } => ("E002", path.clone()),
        ModelError::InvalidExtension { key, path, .. } if key == "query" => {
            ("E005", path.clone())
        }
        ModelError::InvalidExtension { path, .. } => ("E004", path.clone()),
        ModelError::InvalidRecordsPath { path, .. } => ("E004", path.clone()),
        _ => ("E004", "/".to_string()),
    };
    Diagnostic {
        severity: Severity::Error,
        code: code.to_string(),
        file: file.to_path_buf(),
        path,
        message: error.to_string(),
    }
}

/// Whether the model declares a schema for `path`.
///
/// Keys descend through `properties`, indices through `items`.
fn declares_path(model: &Value, path: &FieldPath) -> bool {
    let mut schema = model;
    for segment in path.segments() {
        let next = match segment {
            Segment::Key(key) => schema
                .get("properties")
                .and_then(|props| props.get(key)),
            Segment::Index(_) => schema.get("items"),
        };
        match next {
            Some(child) => schema = child,
            None => return false,
        }
    }
    true
}

/// Collect all .json files in a path (file or directory).
fn collect_model_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
