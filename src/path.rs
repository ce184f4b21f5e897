//! Field paths and value-tree access.
//!
//! A [`FieldPath`] addresses a location in a JSON value tree using dotted
//! (`a.b.0.c`) or bracketed (`a[0].c`) notation. The accessors here never
//! mutate a shared tree: `write` and `remove` take the tree by value and
//! return the updated tree.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::PathError;

/// One step of a field path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(idx) => write!(f, "{}", idx),
        }
    }
}

/// Ordered sequence of segments identifying a location in the value tree.
///
/// The root path is the empty sequence. A dotted segment that is a canonical
/// non-negative integer (`0`, `12`, but not `00`) parses as an array index;
/// everything else is an object key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// The root path (empty segment list).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dotted/bracketed path string. An empty string is the root.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for chunk in input.split('.') {
            if chunk.is_empty() {
                return Err(PathError::EmptySegment {
                    path: input.to_string(),
                });
            }

            let (head, mut rest) = match chunk.find('[') {
                Some(idx) => (&chunk[..idx], &chunk[idx..]),
                None => (chunk, ""),
            };

            if head.is_empty() && rest.is_empty() {
                return Err(PathError::EmptySegment {
                    path: input.to_string(),
                });
            }
            if !head.is_empty() {
                segments.push(Segment::from_chunk(head));
            }

            while !rest.is_empty() {
                let Some(end) = rest.find(']') else {
                    return Err(PathError::UnterminatedIndex {
                        path: input.to_string(),
                    });
                };
                let digits = &rest[1..end];
                let index: usize = digits.parse().map_err(|_| PathError::InvalidIndex {
                    path: input.to_string(),
                    segment: digits.to_string(),
                })?;
                segments.push(Segment::Index(index));
                rest = &rest[end + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(PathError::InvalidIndex {
                        path: input.to_string(),
                        segment: rest.to_string(),
                    });
                }
            }
        }

        Ok(Self(segments))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Path of the enclosing container; `None` at the root.
    pub fn parent(&self) -> Option<FieldPath> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Child path addressing `key` inside this path.
    pub fn child_key(&self, key: &str) -> FieldPath {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.to_string()));
        Self(segments)
    }

    /// Child path addressing array element `index` inside this path.
    pub fn child_index(&self, index: usize) -> FieldPath {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// This path extended by all of `other`'s segments.
    pub fn concat(&self, other: &FieldPath) -> FieldPath {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// True when `prefix` is an ancestor of (or equal to) this path.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// JSON fragment-pointer form, e.g. `#/a/0/b`. The root is `#`.
    pub fn to_pointer(&self) -> String {
        let mut out = String::from("#");
        for segment in &self.0 {
            out.push('/');
            out.push_str(&segment.to_string());
        }
        out
    }
}

impl Segment {
    fn from_chunk(chunk: &str) -> Segment {
        let canonical_index = chunk.bytes().all(|b| b.is_ascii_digit())
            && (chunk.len() == 1 || !chunk.starts_with('0'));
        if canonical_index {
            if let Ok(index) = chunk.parse() {
                return Segment::Index(index);
            }
        }
        Segment::Key(chunk.to_string())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PathVisitor;

        impl Visitor<'_> for PathVisitor {
            type Value = FieldPath;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a dotted field path string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldPath, E> {
                FieldPath::parse(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(PathVisitor)
    }
}

/// Read the value at `path`, if every container along the way exists.
///
/// Returns `None` for any path whose prefix is absent or of the wrong shape.
pub fn read<'a>(tree: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = tree;
    for segment in path.segments() {
        current = match segment {
            Segment::Key(key) => current.as_object()?.get(key)?,
            Segment::Index(idx) => current.as_array()?.get(*idx)?,
        };
    }
    Some(current)
}

/// Write `value` at `path`, auto-vivifying missing intermediate containers.
///
/// The walk is iterative, root to target. For each segment an absent or
/// shape-mismatched container is created: an array when the segment is an
/// index, an object otherwise. An existing container of the right shape is
/// never replaced. Writing to the root path replaces the whole tree with
/// `clean(value)`.
pub fn write(tree: Value, path: &FieldPath, value: Value) -> Value {
    if path.is_root() {
        return clean(value);
    }

    let mut root = tree;
    let mut slot = &mut root;
    for segment in path.segments() {
        slot = child_slot(slot, segment);
    }
    *slot = value;
    root
}

/// Descend one segment from `parent`, creating or reshaping the container.
fn child_slot<'a>(parent: &'a mut Value, segment: &Segment) -> &'a mut Value {
    match segment {
        Segment::Key(key) => {
            if !parent.is_object() {
                *parent = Value::Object(Map::new());
            }
            let Value::Object(map) = parent else {
                return parent;
            };
            map.entry(key.clone()).or_insert(Value::Null)
        }
        Segment::Index(idx) => {
            if !parent.is_array() {
                *parent = Value::Array(Vec::new());
            }
            let Value::Array(items) = parent else {
                return parent;
            };
            if items.len() <= *idx {
                items.resize(idx + 1, Value::Null);
            }
            &mut items[*idx]
        }
    }
}

/// Remove the value at `path`, pruning ancestors that become empty.
///
/// Object keys disappear and array elements are spliced out rather than left
/// as `null` placeholders. Removing the root path yields `null`.
pub fn remove(tree: Value, path: &FieldPath) -> Value {
    if path.is_root() {
        return Value::Null;
    }
    let mut root = tree;
    remove_at(&mut root, path.segments());
    root
}

fn remove_at(slot: &mut Value, segments: &[Segment]) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        match (slot, segment) {
            (Value::Object(map), Segment::Key(key)) => {
                map.remove(key);
            }
            (Value::Array(items), Segment::Index(idx)) if *idx < items.len() => {
                items.remove(*idx);
            }
            _ => {}
        }
        return;
    }

    match (slot, segment) {
        (Value::Object(map), Segment::Key(key)) => {
            let prune = match map.get_mut(key) {
                Some(child) => {
                    remove_at(child, rest);
                    is_empty_container(child)
                }
                None => false,
            };
            if prune {
                map.remove(key);
            }
        }
        (Value::Array(items), Segment::Index(idx)) => {
            let prune = match items.get_mut(*idx) {
                Some(child) => {
                    remove_at(child, rest);
                    is_empty_container(child)
                }
                None => false,
            };
            if prune {
                items.remove(*idx);
            }
        }
        _ => {}
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Recursively drop empty attributes from a tree.
///
/// `null`, empty strings, empty arrays, and empty objects are removed at all
/// depths; numeric zero and boolean `false` are preserved. Arrays keep their
/// container type through recursion.
pub fn clean(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let cleaned = clean(child);
                if !is_empty_value(&cleaned) {
                    out.insert(key, cleaned);
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(clean)
                .filter(|item| !is_empty_value(item))
                .collect(),
        ),
        other => other,
    }
}

/// True for `null`, `""`, `[]`, and `{}`; false for every number and boolean.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) | Value::Bool(_) => false,
    }
}
