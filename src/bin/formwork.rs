//! Formwork CLI
//!
//! Command-line interface for checking form models and validating values.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use formwork::{
    collect_dynamic_sources, lint, load_json, BindingSet, DynamicSourceSpec, FieldPath,
    FileStatus, Orchestrator, Severity,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "formwork")]
#[command(about = "Check form models and validate form values")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check model files for errors (syntax, bad templates, invalid extensions)
    Check {
        /// File or directory to check
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Validate a value file against a form model
    Validate {
        /// Value file to validate
        value: PathBuf,

        /// Model file describing the form
        #[arg(long, short)]
        model: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Show each dynamic source and how it resolves against a value
    Sources {
        /// Model file describing the form
        model: PathBuf,

        /// Value file to resolve references against (empty form if omitted)
        #[arg(long)]
        value: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            path,
            format,
            strict,
            quiet,
        } => run_check(&path, &format, strict, quiet),

        Commands::Validate { value, model, json } => run_validate(&value, &model, json),

        Commands::Sources {
            model,
            value,
            pretty,
        } => run_sources(&model, value.as_deref(), pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_check(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return Err(2);
            }
        }
    } else {
        // Text output
        if !quiet {
            println!("Checking {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let color = match diag.severity {
                    Severity::Error => "\x1b[31m",
                    Severity::Warning => "\x1b[33m",
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color,
                        match diag.severity {
                            Severity::Error => "error",
                            Severity::Warning => "warning",
                        },
                        diag.code,
                        diag.path,
                        diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}

fn report_error(json_output: bool, message: &str) {
    if json_output {
        eprintln!("{}", serde_json::json!({ "error": message }));
    } else {
        eprintln!("Error: {}", message);
    }
}

fn run_validate(value_path: &Path, model_path: &Path, json_output: bool) -> Result<(), u8> {
    let model = load_json(model_path).map_err(|e| {
        report_error(json_output, &format!("loading model: {}", e));
        e.exit_code() as u8
    })?;

    let value = load_json(value_path).map_err(|e| {
        report_error(json_output, &format!("loading value: {}", e));
        e.exit_code() as u8
    })?;

    let orchestrator = Orchestrator::new(&model).map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;

    // Fields whose dynamic source cannot resolve are blocked and exempt
    // from required-field errors. No fetches are performed here.
    let specs = collect_dynamic_sources(&model).map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;
    let mut bindings = BindingSet::new(specs);
    let _ = bindings.evaluate_all(&value);
    let blocked = bindings.blocked_fields();

    let result = orchestrator.validate(&value, &blocked);

    if result.is_valid() {
        if json_output {
            println!(r#"{{"valid":true}}"#);
        } else {
            println!("Valid");
        }
        Ok(())
    } else {
        if json_output {
            let output = serde_json::json!({
                "valid": false,
                "errors": result.errors,
                "warnings": result.warnings,
            });
            println!("{}", output);
        } else {
            eprintln!("Validation failed:");
            for issue in &result.errors {
                eprintln!("  [{}] {}: {}", issue.code, issue.path, issue.message);
            }
        }
        Err(1)
    }
}

fn run_sources(model_path: &Path, value_path: Option<&Path>, pretty: bool) -> Result<(), u8> {
    let model = load_json(model_path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let value = match value_path {
        Some(path) => load_json(path).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?,
        None => Value::Null,
    };

    let specs = collect_dynamic_sources(&model).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut entries = Vec::new();
    for (field, spec) in &specs {
        entries.push(source_entry(field, spec, &value));
    }

    let output = Value::Array(entries);
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    println!("{}", json);
    Ok(())
}

fn source_entry(field: &FieldPath, spec: &DynamicSourceSpec, value: &Value) -> Value {
    let endpoint = spec.endpoint.resolve(value, field);

    let mut missing: Vec<String> = endpoint.missing.iter().map(|p| p.to_string()).collect();
    let mut query = serde_json::Map::new();
    for (param, template) in &spec.query {
        let outcome = template.resolve(value, field);
        missing.extend(outcome.missing.iter().map(|p| p.to_string()));
        match outcome.resolved {
            Some(resolved) => {
                query.insert(param.clone(), Value::String(resolved));
            }
            None => {
                query.insert(param.clone(), Value::Null);
            }
        }
    }
    missing.sort();
    missing.dedup();

    let status = if missing.is_empty() {
        "resolved"
    } else {
        "blocked"
    };

    serde_json::json!({
        "field": field.to_string(),
        "status": status,
        "endpoint": endpoint.resolved,
        "query": query,
        "missing": missing,
    })
}
