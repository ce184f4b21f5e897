//! A form session.
//!
//! [`Form`] wires the reducer, dynamic-source bindings, and the validation
//! orchestrator together, and surfaces the consumer contract as events: each
//! call applies its transitions atomically and returns the events a renderer
//! would deliver through `onChange`/`onValidation`/`onError` callbacks,
//! after the transition settles and never mid-transition.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::binding::{BindingSet, Completion, FetchRequest, Ticket};
use crate::error::{FieldError, ModelError};
use crate::fetch::FetchFailure;
use crate::model::collect_dynamic_sources;
use crate::path::FieldPath;
use crate::store::{reduce, FormState, Transition, ValidationResult};
use crate::validator::Orchestrator;

/// A consumer-visible effect of a settled transition.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// The root value changed.
    Change(Value),
    /// A dynamic source resolved to a new target; perform this fetch and
    /// call [`Form::complete_fetch`] with the result.
    FetchNeeded(FetchRequest),
    /// The validation report, emitted once all in-flight fetches settle.
    Validation(ValidationResult),
    /// Resolution errors for one field, delivered immediately.
    Error(FieldPath, Vec<FieldError>),
}

/// One form session over a model.
pub struct Form {
    orchestrator: Orchestrator,
    state: FormState,
    bindings: BindingSet,
    show_all_errors: bool,
    touched: BTreeSet<FieldPath>,
}

impl Form {
    /// Parse the model's dynamic sources and compile its structural schema.
    pub fn new(model: &Value) -> Result<Self, ModelError> {
        let orchestrator = Orchestrator::new(model)?;
        let bindings = BindingSet::new(collect_dynamic_sources(model)?);
        Ok(Self {
            orchestrator,
            state: FormState::default(),
            bindings,
            show_all_errors: false,
            touched: BTreeSet::new(),
        })
    }

    /// Reset to the canonical empty state and evaluate every binding.
    ///
    /// Literal-endpoint fields fetch right away; fields with unresolved
    /// references start out blocked.
    pub fn init(&mut self) -> Vec<FormEvent> {
        self.state = reduce(&self.state, &Transition::Init);
        self.touched.clear();

        let mut events = vec![FormEvent::Change(self.state.value.clone())];
        for request in self.bindings.evaluate_all(&self.state.value) {
            events.push(FormEvent::FetchNeeded(request));
        }
        self.revalidate(&mut events);
        events
    }

    /// Apply a value change at `path`.
    ///
    /// `null`, `""`, and `[]` remove the value; the root path replaces the
    /// whole tree.
    pub fn set_value(&mut self, path: FieldPath, value: Value) -> Vec<FormEvent> {
        let transition = Transition::ChangeValue {
            path: path.clone(),
            value,
        };
        self.state = reduce(&self.state, &transition);
        self.touched.insert(path.clone());

        let mut events = vec![FormEvent::Change(self.state.value.clone())];
        for request in self.bindings.on_value_change(&path, &self.state.value) {
            events.push(FormEvent::FetchNeeded(request));
        }
        self.revalidate(&mut events);
        events
    }

    /// Deliver the result of a previously requested fetch.
    ///
    /// A stale result — the ticket was superseded by a later value change —
    /// is discarded without producing events.
    pub fn complete_fetch(
        &mut self,
        ticket: &Ticket,
        result: Result<Value, FetchFailure>,
    ) -> Vec<FormEvent> {
        let mut events = Vec::new();
        match self.bindings.complete(ticket, result) {
            Completion::Stale => return events,
            Completion::Ready => {}
            Completion::Failed(errors) => {
                // error channel is independent of the debounced validation
                // cycle
                events.push(FormEvent::Error(ticket.field().clone(), errors));
            }
        }
        self.revalidate(&mut events);
        events
    }

    /// Turn full error visibility on or off.
    ///
    /// Until set, validation events only carry errors for touched fields;
    /// the internal report is always complete either way.
    pub fn set_show_all_errors(&mut self, show: bool) -> Vec<FormEvent> {
        self.show_all_errors = show;
        let mut events = Vec::new();
        if self.bindings.in_flight() == 0 {
            events.push(FormEvent::Validation(self.visible_result()));
        }
        events
    }

    /// Current form state snapshot.
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Current root value.
    pub fn value(&self) -> &Value {
        &self.state.value
    }

    /// Full current validation report, regardless of visibility gating.
    pub fn validation_result(&self) -> &ValidationResult {
        &self.state.validation_result
    }

    /// Records fetched for a dynamic field, when available.
    pub fn records(&self, field: &FieldPath) -> Option<&[Value]> {
        self.bindings.get(field).and_then(|b| b.records())
    }

    /// True when the field is disabled by unresolved references.
    pub fn is_blocked(&self, field: &FieldPath) -> bool {
        self.bindings
            .get(field)
            .map(|b| b.is_blocked())
            .unwrap_or(false)
    }

    /// Recompute the report and apply it through the store.
    ///
    /// The validation event is withheld while fetches are in flight; the
    /// report is flushed by the completion that settles the last one.
    fn revalidate(&mut self, events: &mut Vec<FormEvent>) {
        let transition = self
            .orchestrator
            .resolved_transition(&self.state.value, &self.bindings);
        self.state = reduce(&self.state, &transition);

        if self.bindings.in_flight() == 0 {
            events.push(FormEvent::Validation(self.visible_result()));
        }
    }

    fn visible_result(&self) -> ValidationResult {
        if self.show_all_errors {
            return self.state.validation_result.clone();
        }
        ValidationResult {
            errors: self
                .state
                .validation_result
                .errors
                .iter()
                .filter(|issue| self.is_touched_pointer(&issue.path))
                .cloned()
                .collect(),
            warnings: self.state.validation_result.warnings.clone(),
        }
    }

    fn is_touched_pointer(&self, pointer: &str) -> bool {
        self.touched.iter().any(|field| {
            let prefix = field.to_pointer();
            pointer == prefix || pointer.starts_with(&format!("{}/", prefix))
        })
    }
}
