//! Formwork
//!
//! Schema-driven form state engine.
//!
//! Given a JSON-Schema-like model, this library maintains an immutable value
//! tree addressed by dotted paths, resolves dynamic data sources whose
//! endpoints and query parameters reference other fields' live values, and
//! validates the tree incrementally, merging structural validation with
//! resolution-time errors into a single report.
//!
//! # Example
//!
//! ```
//! use formwork::{reduce, FieldPath, FormState, Transition};
//! use serde_json::json;
//!
//! let state = FormState::default();
//! let path: FieldPath = "a.0.b".parse().unwrap();
//!
//! // intermediate containers are created on demand
//! let state = reduce(&state, &Transition::ChangeValue { path, value: json!("x") });
//! assert_eq!(state.value, json!({"a": [{"b": "x"}]}));
//!
//! // writing null removes the value and prunes emptied ancestors
//! let path: FieldPath = "a.0.b".parse().unwrap();
//! let state = reduce(&state, &Transition::ChangeValue { path, value: json!(null) });
//! assert_eq!(state.value, json!({}));
//! ```
//!
//! # Dynamic sources
//!
//! A property schema may declare a remote data source with an `endpoint`
//! template referencing sibling fields:
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": {
//!     "foo": { "type": "string", "endpoint": "${./bar}/api/", "recordsPath": "" },
//!     "bar": { "type": "string" }
//!   }
//! }
//! ```
//!
//! While `bar` has no value, `foo` is blocked (disabled, and exempt from
//! required-field errors). Once `bar` is set, [`Form`] hands out a
//! [`FetchRequest`] for `bar`'s value substituted into the endpoint; results
//! arriving for a superseded source are discarded.

mod binding;
mod error;
mod fetch;
mod form;
mod linter;
mod loader;
mod model;
mod path;
mod store;
mod template;
mod validator;

pub use binding::{
    BindingSet, BindingState, Completion, FetchRequest, ResolvedSource, SourceBinding, Ticket,
};
pub use error::{FieldError, ModelError, PathError, StoreError};
pub use fetch::{FetchFailure, RecordFetcher};
pub use form::{Form, FormEvent};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{load_json, load_json_str};
pub use model::{
    collect_dynamic_sources, json_type_name, strip_extensions, DynamicSourceSpec,
    SOURCE_EXTENSIONS,
};
pub use path::{clean, is_empty_value, read, remove, write, FieldPath, Segment};
pub use store::{
    dispatch, reduce, FormState, Transition, ValidationIssue, ValidationResult, CHANGE_VALUE,
    INIT, VALIDATION_RESOLVED,
};
pub use template::{Part, RefPath, Resolution, Template, TemplateError};
pub use validator::Orchestrator;

#[cfg(feature = "remote")]
pub use fetch::HttpFetcher;
