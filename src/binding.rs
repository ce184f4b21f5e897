//! Dynamic source bindings.
//!
//! Each field whose data source depends on other fields gets a
//! [`SourceBinding`]: a small state machine that re-resolves the source's
//! templates on relevant value changes, asks for a fetch when the resolved
//! source changes, and discards results that arrive for a superseded source.
//!
//! Fetches are the only suspension points in the engine. A binding never
//! performs I/O itself; it hands out a [`FetchRequest`] and the consumer
//! completes it later with [`SourceBinding::complete`]. The request carries
//! a [`Ticket`] minted at dispatch time; a completion whose ticket no longer
//! matches the binding's generation is reported as [`Completion::Stale`] and
//! has no effect. That is the whole cancellation contract: in-flight calls
//! are not cancelled, their effects are suppressed.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::error::FieldError;
use crate::fetch::FetchFailure;
use crate::model::DynamicSourceSpec;
use crate::path::{read, FieldPath};

/// A fully resolved data source: endpoint URL plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub url: String,
    pub query: BTreeMap<String, String>,
}

/// Identifies one dispatched fetch. Completions are matched against the
/// binding's current generation; a mismatch means the fetch went stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    field: FieldPath,
    generation: u64,
}

impl Ticket {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }
}

/// A fetch the consumer should perform on the binding's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub field: FieldPath,
    pub source: ResolvedSource,
    pub ticket: Ticket,
}

/// Lifecycle of a dynamic field's source.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingState {
    /// No evaluation has happened yet.
    Idle,
    /// At least one referenced path has no value; the field is disabled.
    Blocked { missing: BTreeSet<FieldPath> },
    /// A fetch for `source` is in flight.
    Fetching { source: ResolvedSource },
    /// Records are available to the renderer.
    Ready { records: Vec<Value> },
    /// The last fetch failed; the field's value is untouched.
    Failed { errors: Vec<FieldError> },
}

/// Result of completing a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The result was for a superseded source and was discarded.
    Stale,
    /// Records are now available.
    Ready,
    /// The fetch failed; deliver these on the field's error channel.
    Failed(Vec<FieldError>),
}

/// State machine for one dynamic field.
#[derive(Debug, Clone)]
pub struct SourceBinding {
    field: FieldPath,
    spec: DynamicSourceSpec,
    referenced: BTreeSet<FieldPath>,
    state: BindingState,
    /// Most recent successfully fetched source and its records; lets a
    /// binding return to `Ready` without refetching when references flip
    /// away and back to the same resolved source.
    last_completed: Option<(ResolvedSource, Vec<Value>)>,
    generation: u64,
}

impl SourceBinding {
    pub fn new(field: FieldPath, spec: DynamicSourceSpec) -> Self {
        let mut referenced = spec.endpoint.referenced_paths(&field);
        for template in spec.query.values() {
            referenced.extend(template.referenced_paths(&field));
        }
        Self {
            field,
            spec,
            referenced,
            state: BindingState::Idle,
            last_completed: None,
            generation: 0,
        }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn state(&self) -> &BindingState {
        &self.state
    }

    pub fn spec(&self) -> &DynamicSourceSpec {
        &self.spec
    }

    /// Paths this binding's templates depend on.
    pub fn referenced_paths(&self) -> &BTreeSet<FieldPath> {
        &self.referenced
    }

    /// True when the field input should be disabled.
    pub fn is_blocked(&self) -> bool {
        matches!(self.state, BindingState::Blocked { .. })
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.state, BindingState::Fetching { .. })
    }

    /// The fetched record set, when `Ready`.
    pub fn records(&self) -> Option<&[Value]> {
        match &self.state {
            BindingState::Ready { records } => Some(records),
            _ => None,
        }
    }

    /// True when a change at `changed` can affect this binding's resolution.
    pub fn depends_on(&self, changed: &FieldPath) -> bool {
        if changed.is_root() {
            return !self.referenced.is_empty();
        }
        self.referenced
            .iter()
            .any(|r| r.starts_with(changed) || changed.starts_with(r))
    }

    /// Resolve all templates against the current tree.
    fn resolve_source(&self, tree: &Value) -> Result<ResolvedSource, BTreeSet<FieldPath>> {
        let mut missing = BTreeSet::new();

        let endpoint = self.spec.endpoint.resolve(tree, &self.field);
        missing.extend(endpoint.missing.iter().cloned());

        let mut query = BTreeMap::new();
        for (param, template) in &self.spec.query {
            let outcome = template.resolve(tree, &self.field);
            missing.extend(outcome.missing.iter().cloned());
            if let Some(resolved) = outcome.resolved {
                query.insert(param.clone(), resolved);
            }
        }

        match endpoint.resolved {
            Some(url) if missing.is_empty() => Ok(ResolvedSource { url, query }),
            _ => Err(missing),
        }
    }

    /// Re-run resolution against the current tree.
    ///
    /// Returns a [`FetchRequest`] exactly when all references resolve and
    /// the resolved source differs from the last fetched one. Re-evaluation
    /// with an unchanged source is a no-op.
    pub fn reevaluate(&mut self, tree: &Value) -> Option<FetchRequest> {
        match self.resolve_source(tree) {
            Err(missing) => {
                // any in-flight fetch is now stale
                if self.is_fetching() {
                    self.generation += 1;
                }
                self.state = BindingState::Blocked { missing };
                None
            }
            Ok(source) => {
                if let BindingState::Fetching { source: current } = &self.state {
                    if *current == source {
                        return None;
                    }
                }
                if let Some((completed, records)) = &self.last_completed {
                    if *completed == source {
                        // back to a source already fetched, no refetch
                        self.state = BindingState::Ready {
                            records: records.clone(),
                        };
                        return None;
                    }
                }

                self.generation += 1;
                self.state = BindingState::Fetching {
                    source: source.clone(),
                };
                Some(FetchRequest {
                    field: self.field.clone(),
                    ticket: Ticket {
                        field: self.field.clone(),
                        generation: self.generation,
                    },
                    source,
                })
            }
        }
    }

    /// Deliver a fetch result.
    ///
    /// A ticket minted before the latest re-evaluation is stale: the result
    /// is discarded and the state left untouched.
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        result: Result<Value, FetchFailure>,
    ) -> Completion {
        if ticket.field != self.field || ticket.generation != self.generation {
            return Completion::Stale;
        }
        let BindingState::Fetching { source } = &self.state else {
            return Completion::Stale;
        };
        let source = source.clone();

        match result {
            Ok(response) => match extract_records(&response, &self.spec.records_path) {
                Some(records) => {
                    self.last_completed = Some((source, records.clone()));
                    self.state = BindingState::Ready { records };
                    Completion::Ready
                }
                None => {
                    let errors = vec![FieldError {
                        path: self.field.clone(),
                        message: format!(
                            "no record array at \"{}\" in response",
                            self.spec.records_path
                        ),
                    }];
                    self.state = BindingState::Failed {
                        errors: errors.clone(),
                    };
                    Completion::Failed(errors)
                }
            },
            Err(failure) => {
                let errors: Vec<FieldError> = failure
                    .details()
                    .iter()
                    .map(|detail| FieldError {
                        path: self.field.clone(),
                        message: detail.clone(),
                    })
                    .collect();
                self.state = BindingState::Failed {
                    errors: errors.clone(),
                };
                Completion::Failed(errors)
            }
        }
    }
}

fn extract_records(response: &Value, records_path: &FieldPath) -> Option<Vec<Value>> {
    read(response, records_path).and_then(Value::as_array).cloned()
}

/// All dynamic-source bindings of one form.
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    bindings: BTreeMap<FieldPath, SourceBinding>,
}

impl BindingSet {
    pub fn new(specs: BTreeMap<FieldPath, DynamicSourceSpec>) -> Self {
        let bindings = specs
            .into_iter()
            .map(|(field, spec)| (field.clone(), SourceBinding::new(field, spec)))
            .collect();
        Self { bindings }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, field: &FieldPath) -> Option<&SourceBinding> {
        self.bindings.get(field)
    }

    /// Evaluate every binding, e.g. at form start.
    pub fn evaluate_all(&mut self, tree: &Value) -> Vec<FetchRequest> {
        self.bindings
            .values_mut()
            .filter_map(|binding| binding.reevaluate(tree))
            .collect()
    }

    /// Re-evaluate the bindings affected by a change at `changed`.
    ///
    /// A binding whose own field changed is also re-evaluated so its first
    /// evaluation is not skipped; unrelated bindings are left alone.
    pub fn on_value_change(&mut self, changed: &FieldPath, tree: &Value) -> Vec<FetchRequest> {
        self.bindings
            .values_mut()
            .filter(|binding| {
                matches!(binding.state, BindingState::Idle) || binding.depends_on(changed)
            })
            .filter_map(|binding| binding.reevaluate(tree))
            .collect()
    }

    /// Route a fetch completion to its binding.
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        result: Result<Value, FetchFailure>,
    ) -> Completion {
        match self.bindings.get_mut(&ticket.field) {
            Some(binding) => binding.complete(ticket, result),
            None => Completion::Stale,
        }
    }

    /// Fields currently disabled by unresolved references.
    pub fn blocked_fields(&self) -> BTreeSet<FieldPath> {
        self.bindings
            .values()
            .filter(|binding| binding.is_blocked())
            .map(|binding| binding.field.clone())
            .collect()
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.bindings
            .values()
            .filter(|binding| binding.is_fetching())
            .count()
    }

    /// Resolution errors of all failed bindings, keyed by field.
    pub fn resolution_errors(&self) -> BTreeMap<FieldPath, Vec<FieldError>> {
        self.bindings
            .values()
            .filter_map(|binding| match &binding.state {
                BindingState::Failed { errors } => {
                    Some((binding.field.clone(), errors.clone()))
                }
                _ => None,
            })
            .collect()
    }
}
