//! Form state and its reducer.
//!
//! [`FormState`] is owned exclusively by the reducer: every transition
//! produces a new state, prior states are never mutated in place. Value
//! changes and validation results are reconciled asynchronously — a
//! [`Transition::ChangeValue`] never touches `errors`/`validation_result`,
//! and a [`Transition::ValidationResolved`] never touches `value`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, StoreError};
use crate::model::json_type_name;
use crate::path::{clean, remove, write, FieldPath};

/// Transition kind strings for the raw action form.
pub const CHANGE_VALUE: &str = "CHANGE_VALUE";
pub const VALIDATION_RESOLVED: &str = "VALIDATION_RESOLVED";
pub const INIT: &str = "INIT";

/// A single structural validation issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Short machine code, e.g. `required` or `type`.
    pub code: String,
    pub message: String,
    /// Fragment-pointer location, e.g. `#/foo`.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(default)]
    pub is_required_error: bool,
}

/// Full structural validation report for the current value tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// State of one form session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    /// The value tree; `null` when the form is empty.
    pub value: Value,
    /// Per-field resolution errors, fed by the validation-resolved channel.
    pub errors: BTreeMap<FieldPath, Vec<FieldError>>,
    /// Most recent orchestrator report for the current value.
    pub validation_result: ValidationResult,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            value: Value::Null,
            errors: BTreeMap::new(),
            validation_result: ValidationResult::default(),
        }
    }
}

/// External transitions over [`FormState`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Set, or remove, the value at a path. The root path replaces the whole
    /// tree.
    ChangeValue { path: FieldPath, value: Value },
    /// Replace the resolution errors and validation report wholesale. The
    /// sole channel by which orchestrator output reaches consumers.
    ValidationResolved {
        errors: BTreeMap<FieldPath, Vec<FieldError>>,
        validation_result: ValidationResult,
    },
    /// Reset to the canonical empty state.
    Init,
}

impl Transition {
    /// Parse a raw JSON action of the form `{"type": ..., ...}`.
    ///
    /// An unrecognized `type` is a protocol violation; the caller should
    /// keep its previous state and report the error.
    pub fn from_action(action: &Value) -> Result<Self, StoreError> {
        let kind = action
            .get("type")
            .and_then(Value::as_str)
            .ok_or(StoreError::MissingKind)?;

        match kind {
            CHANGE_VALUE => {
                let path = match action.get("path") {
                    None | Some(Value::Null) => FieldPath::root(),
                    Some(Value::String(s)) => {
                        FieldPath::parse(s).map_err(|e| StoreError::MalformedTransition {
                            kind: kind.to_string(),
                            message: e.to_string(),
                        })?
                    }
                    Some(other) => {
                        return Err(StoreError::MalformedTransition {
                            kind: kind.to_string(),
                            message: format!(
                                "path must be a string, got {}",
                                json_type_name(other)
                            ),
                        })
                    }
                };
                let value = action.get("value").cloned().unwrap_or(Value::Null);
                Ok(Transition::ChangeValue { path, value })
            }

            VALIDATION_RESOLVED => {
                let errors = match action.get("errors") {
                    None | Some(Value::Null) => BTreeMap::new(),
                    Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
                        StoreError::MalformedTransition {
                            kind: kind.to_string(),
                            message: format!("errors: {}", e),
                        }
                    })?,
                };
                let validation_result = match action.get("validationResult") {
                    None | Some(Value::Null) => ValidationResult::default(),
                    Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
                        StoreError::MalformedTransition {
                            kind: kind.to_string(),
                            message: format!("validationResult: {}", e),
                        }
                    })?,
                };
                Ok(Transition::ValidationResolved {
                    errors,
                    validation_result,
                })
            }

            INIT => Ok(Transition::Init),

            other => Err(StoreError::UnknownTransition {
                kind: other.to_string(),
            }),
        }
    }
}

/// Pure state-transition function.
///
/// Same `(state, transition)` always yields the same new state; nothing
/// outside the two arguments is read or written.
pub fn reduce(state: &FormState, transition: &Transition) -> FormState {
    match transition {
        Transition::ChangeValue { path, value } => {
            let next_value = if path.is_root() {
                clean(value.clone())
            } else if is_removal(value) {
                remove(state.value.clone(), path)
            } else {
                write(state.value.clone(), path, value.clone())
            };
            FormState {
                value: next_value,
                errors: state.errors.clone(),
                validation_result: state.validation_result.clone(),
            }
        }

        Transition::ValidationResolved {
            errors,
            validation_result,
        } => FormState {
            value: state.value.clone(),
            errors: errors.clone(),
            validation_result: validation_result.clone(),
        },

        Transition::Init => FormState::default(),
    }
}

/// Apply a raw JSON action to a state.
///
/// The typed entry point for protocol violations: an unrecognized or
/// malformed action returns `Err` and the caller keeps the previous state.
pub fn dispatch(state: &FormState, action: &Value) -> Result<FormState, StoreError> {
    let transition = Transition::from_action(action)?;
    Ok(reduce(state, &transition))
}

/// Writing `null`, an empty string, or an empty array routes to deletion.
fn is_removal(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
