//! Reference templates for dynamic sources.
//!
//! An endpoint or query-parameter string may embed `${...}` placeholders
//! referencing other fields. Templates are parsed once, when the model is
//! loaded, into a small AST of literal and reference parts; re-resolution on
//! value changes then only walks the parsed parts.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::error::PathError;
use crate::path::{read, FieldPath};

/// Errors while parsing a `${...}` template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated placeholder in \"{template}\"")]
    Unterminated { template: String },

    #[error("empty placeholder in \"{template}\"")]
    EmptyReference { template: String },

    #[error("invalid reference \"{reference}\" in \"{template}\": {source}")]
    BadReference {
        template: String,
        reference: String,
        #[source]
        source: PathError,
    },
}

/// A reference to another field, relative or absolute.
///
/// `./bar` addresses a sibling (resolved against the field's parent path);
/// each additional `../` pops one more ancestor. A reference without a
/// leading `./` or `../` is absolute from the root of the value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPath {
    /// `None` for absolute references; `Some(n)` pops `n` ancestors beyond
    /// the field's own parent.
    up: Option<usize>,
    rel: FieldPath,
}

impl RefPath {
    fn parse(raw: &str, template: &str) -> Result<Self, TemplateError> {
        let mut rest = raw;
        let up = if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
            Some(0)
        } else if rest.starts_with("../") {
            let mut levels = 0;
            while let Some(stripped) = rest.strip_prefix("../") {
                rest = stripped;
                levels += 1;
            }
            Some(levels)
        } else {
            None
        };

        let rel = FieldPath::parse(rest).map_err(|source| TemplateError::BadReference {
            template: template.to_string(),
            reference: raw.to_string(),
            source,
        })?;
        if rel.is_root() {
            return Err(TemplateError::EmptyReference {
                template: template.to_string(),
            });
        }

        Ok(Self { up, rel })
    }

    /// Absolute path of this reference as seen from `field`.
    pub fn absolute(&self, field: &FieldPath) -> FieldPath {
        match self.up {
            None => self.rel.clone(),
            Some(levels) => {
                let mut base = field.parent().unwrap_or_default();
                for _ in 0..levels {
                    base = base.parent().unwrap_or_default();
                }
                base.concat(&self.rel)
            }
        }
    }
}

/// One parsed part of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Literal(String),
    Reference(RefPath),
}

/// Outcome of substituting current values into a template.
///
/// `resolved` is `Some` exactly when `missing` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: Option<String>,
    pub missing: BTreeSet<FieldPath>,
}

/// A parsed string template with `${...}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    parts: Vec<Part>,
}

impl Template {
    /// Parse a template string into literal and reference parts.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                return Err(TemplateError::Unterminated {
                    template: template.to_string(),
                });
            };
            let raw_ref = &after[..end];
            if raw_ref.is_empty() {
                return Err(TemplateError::EmptyReference {
                    template: template.to_string(),
                });
            }
            parts.push(Part::Reference(RefPath::parse(raw_ref, template)?));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            raw: template.to_string(),
            parts,
        })
    }

    /// The original template string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// True when the template contains no references.
    pub fn is_literal(&self) -> bool {
        self.parts
            .iter()
            .all(|part| matches!(part, Part::Literal(_)))
    }

    /// Absolute paths this template depends on, as seen from `field`.
    pub fn referenced_paths(&self, field: &FieldPath) -> BTreeSet<FieldPath> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Reference(r) => Some(r.absolute(field)),
                Part::Literal(_) => None,
            })
            .collect()
    }

    /// Substitute current values into the template.
    ///
    /// A referenced path with no value — absent, `null`, an empty string, or
    /// a container — lands in `missing` and leaves the template unresolved.
    /// Pure; never performs I/O.
    pub fn resolve(&self, tree: &Value, field: &FieldPath) -> Resolution {
        let mut out = String::new();
        let mut missing = BTreeSet::new();

        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Reference(r) => {
                    let absolute = r.absolute(field);
                    match read(tree, &absolute).and_then(scalar_text) {
                        Some(text) => out.push_str(&text),
                        None => {
                            missing.insert(absolute);
                        }
                    }
                }
            }
        }

        Resolution {
            resolved: if missing.is_empty() { Some(out) } else { None },
            missing,
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// String form of a scalar reference value; `None` blocks resolution.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
