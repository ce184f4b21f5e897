//! Form model parsing.
//!
//! A model is a JSON-Schema-like object. Property schemas may carry form
//! extensions describing a remote data source: `endpoint`, `query`,
//! `labelAttribute`, `valueAttribute`, and `recordsPath`. This module parses
//! those extensions into immutable [`DynamicSourceSpec`]s and strips them
//! back out so the remainder is a standard JSON Schema fit for the
//! structural validator.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::path::FieldPath;
use crate::template::Template;

/// Form extension keys recognized on a property schema.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "endpoint",
    "query",
    "labelAttribute",
    "valueAttribute",
    "recordsPath",
];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Remote data source of a dynamic field.
///
/// Parsed once when the model is loaded; the templates never change for the
/// form's lifetime, only the values they reference do.
#[derive(Debug, Clone)]
pub struct DynamicSourceSpec {
    /// Endpoint URL template.
    pub endpoint: Template,
    /// Query parameter templates, parsed per-value.
    pub query: BTreeMap<String, Template>,
    /// Record attribute shown to the user.
    pub label_attribute: String,
    /// Record attribute stored as the field's value.
    pub value_attribute: String,
    /// Dot path into the fetch response locating the record array; the root
    /// path means the response itself is the array.
    pub records_path: FieldPath,
}

impl DynamicSourceSpec {
    /// Parse the extensions of one property schema.
    ///
    /// Returns `Ok(None)` when the property has no `endpoint`. `path` is the
    /// slash-separated schema location used in error messages.
    pub fn from_property(prop: &Value, path: &str) -> Result<Option<Self>, ModelError> {
        let Some(endpoint_value) = prop.get("endpoint") else {
            return Ok(None);
        };
        let Some(endpoint_str) = endpoint_value.as_str() else {
            return Err(ModelError::InvalidExtension {
                key: "endpoint".into(),
                path: format!("{}/endpoint", path),
                expected: "string",
                actual: json_type_name(endpoint_value),
            });
        };
        let endpoint =
            Template::parse(endpoint_str).map_err(|source| ModelError::InvalidTemplate {
                path: format!("{}/endpoint", path),
                source,
            })?;

        let mut query = BTreeMap::new();
        if let Some(query_value) = prop.get("query") {
            let Some(map) = query_value.as_object() else {
                return Err(ModelError::InvalidExtension {
                    key: "query".into(),
                    path: format!("{}/query", path),
                    expected: "object",
                    actual: json_type_name(query_value),
                });
            };
            for (param, raw) in map {
                let Some(raw_str) = raw.as_str() else {
                    return Err(ModelError::InvalidExtension {
                        key: "query".into(),
                        path: format!("{}/query/{}", path, param),
                        expected: "string",
                        actual: json_type_name(raw),
                    });
                };
                let template =
                    Template::parse(raw_str).map_err(|source| ModelError::InvalidTemplate {
                        path: format!("{}/query/{}", path, param),
                        source,
                    })?;
                query.insert(param.clone(), template);
            }
        }

        let label_attribute = string_extension(prop, "labelAttribute", path)?
            .unwrap_or_else(|| "label".to_string());
        let value_attribute = string_extension(prop, "valueAttribute", path)?
            .unwrap_or_else(|| "value".to_string());

        let records_path = match string_extension(prop, "recordsPath", path)? {
            Some(raw) => {
                FieldPath::parse(&raw).map_err(|source| ModelError::InvalidRecordsPath {
                    path: format!("{}/recordsPath", path),
                    source,
                })?
            }
            None => FieldPath::root(),
        };

        Ok(Some(Self {
            endpoint,
            query,
            label_attribute,
            value_attribute,
            records_path,
        }))
    }
}

fn string_extension(prop: &Value, key: &str, path: &str) -> Result<Option<String>, ModelError> {
    match prop.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ModelError::InvalidExtension {
            key: key.to_string(),
            path: format!("{}/{}", path, key),
            expected: "string",
            actual: json_type_name(other),
        }),
    }
}

/// Collect the dynamic sources declared anywhere in a model.
///
/// Walks `properties` chains recursively; a property carrying an `endpoint`
/// becomes a dynamic field keyed by its field path. Sources under `items`
/// are not bound (array elements have no stable path at model-load time).
pub fn collect_dynamic_sources(
    model: &Value,
) -> Result<BTreeMap<FieldPath, DynamicSourceSpec>, ModelError> {
    let mut sources = BTreeMap::new();
    collect_into(model, &FieldPath::root(), "", &mut sources)?;
    Ok(sources)
}

fn collect_into(
    schema: &Value,
    field: &FieldPath,
    schema_path: &str,
    sources: &mut BTreeMap<FieldPath, DynamicSourceSpec>,
) -> Result<(), ModelError> {
    let Some(props) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (name, prop) in props {
        let child_field = field.child_key(name);
        let child_path = format!("{}/properties/{}", schema_path, name);
        if let Some(spec) = DynamicSourceSpec::from_property(prop, &child_path)? {
            sources.insert(child_field.clone(), spec);
        }
        collect_into(prop, &child_field, &child_path, sources)?;
    }

    Ok(())
}

/// Strip the form extensions from a model.
///
/// Recursively removes the [`SOURCE_EXTENSIONS`] keys from schema objects so
/// the result is a standard JSON Schema. Property names that happen to match
/// an extension key are left alone; only schema-object keys are stripped.
pub fn strip_extensions(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                if SOURCE_EXTENSIONS.contains(&key.as_str()) {
                    continue;
                }
                let stripped = match key.as_str() {
                    "properties" | "$defs" | "definitions" => strip_map_values(value),
                    "items" | "additionalProperties" => strip_extensions(value),
                    "allOf" | "anyOf" | "oneOf" => strip_list(value),
                    _ => value.clone(),
                };
                out.insert(key.clone(), stripped);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn strip_map_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (name, child) in map {
                out.insert(name.clone(), strip_extensions(child));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn strip_list(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(strip_extensions).collect()),
        other => other.clone(),
    }
}
