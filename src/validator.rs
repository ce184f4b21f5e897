//! Validation orchestration.
//!
//! Combines structural schema validation with the resolution state of the
//! dynamic-source bindings into one consumer-visible report, and applies the
//! required-field visibility policy: a field the user cannot fill yet (its
//! references are unresolved) must not be flagged as missing.

use std::collections::BTreeSet;

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use serde_json::Value;

use crate::binding::BindingSet;
use crate::error::ModelError;
use crate::model::strip_extensions;
use crate::path::FieldPath;
use crate::store::{Transition, ValidationIssue, ValidationResult};

/// Runs structural validation for one form session.
///
/// The model is stripped of form extensions and compiled once; every
/// validation pass then only iterates errors against the current tree.
pub struct Orchestrator {
    validator: jsonschema::Validator,
}

impl Orchestrator {
    /// Compile the model's structural schema.
    pub fn new(model: &Value) -> Result<Self, ModelError> {
        let schema = strip_extensions(model);
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            ModelError::InvalidSchema {
                message: e.to_string(),
            }
        })?;
        Ok(Self { validator })
    }

    /// Validate a value tree, suppressing required errors for blocked fields.
    ///
    /// An empty form (`null` root) validates as an empty object rather than
    /// tripping a top-level type error.
    pub fn validate(&self, value: &Value, blocked: &BTreeSet<FieldPath>) -> ValidationResult {
        let empty = Value::Object(serde_json::Map::new());
        let target = if value.is_null() { &empty } else { value };

        let blocked_pointers: BTreeSet<String> =
            blocked.iter().map(FieldPath::to_pointer).collect();

        let errors = self
            .validator
            .iter_errors(target)
            .map(|e| issue_from_error(&e))
            .filter(|issue| !(issue.is_required_error && blocked_pointers.contains(&issue.path)))
            .collect();

        ValidationResult {
            errors,
            warnings: Vec::new(),
        }
    }

    /// Build the full validation-resolved transition for the store.
    ///
    /// The transition always carries the complete current report — the
    /// structural result plus every failed binding's resolution errors —
    /// never a delta.
    pub fn resolved_transition(&self, value: &Value, bindings: &BindingSet) -> Transition {
        let validation_result = self.validate(value, &bindings.blocked_fields());
        Transition::ValidationResolved {
            errors: bindings.resolution_errors(),
            validation_result,
        }
    }
}

/// Map one structural error to a consumer-visible issue.
///
/// Required errors are addressed at the missing property itself, not at its
/// parent object, so the visibility policy can match them against blocked
/// fields.
fn issue_from_error(error: &ValidationError<'_>) -> ValidationIssue {
    let mut pointer = error.instance_path.to_string();
    let mut code = "schema";
    let mut is_required_error = false;

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            code = "required";
            is_required_error = true;
            if let Some(name) = property.as_str() {
                pointer = format!("{}/{}", pointer, name);
            }
        }
        ValidationErrorKind::Type { .. } => code = "type",
        ValidationErrorKind::Enum { .. } => code = "enum",
        _ => {}
    }

    ValidationIssue {
        code: code.to_string(),
        message: error.to_string(),
        path: format!("#{}", pointer),
        params: None,
        is_required_error,
    }
}
