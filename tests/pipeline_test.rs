//! End-to-end tests driving a [`Form`] session: blocked dynamic fields,
//! reference resolution, stale fetch discarding, and validation gating.

use formwork::{FetchFailure, FieldPath, Form, FormEvent};
use serde_json::{json, Value};

fn path(s: &str) -> FieldPath {
    s.parse().unwrap()
}

fn model() -> Value {
    json!({
        "type": "object",
        "required": ["foo", "bar"],
        "properties": {
            "foo": {
                "type": "string",
                "endpoint": "${./bar}/api/",
                "query": {"plan": "${./bar}"},
                "recordsPath": ""
            },
            "bar": {"type": "string"}
        }
    })
}

fn fetch_requests(events: &[FormEvent]) -> Vec<&formwork::FetchRequest> {
    events
        .iter()
        .filter_map(|e| match e {
            FormEvent::FetchNeeded(r) => Some(r),
            _ => None,
        })
        .collect()
}

fn validations(events: &[FormEvent]) -> Vec<&formwork::ValidationResult> {
    events
        .iter()
        .filter_map(|e| match e {
            FormEvent::Validation(v) => Some(v),
            _ => None,
        })
        .collect()
}

#[test]
fn blocked_field_is_exempt_from_required() {
    let mut form = Form::new(&model()).unwrap();
    let events = form.init();

    // bar has no value, so foo's endpoint cannot resolve
    assert!(form.is_blocked(&path("foo")));
    assert!(fetch_requests(&events).is_empty());

    // the full report requires bar but not the blocked foo
    let report = form.validation_result();
    let required: Vec<&str> = report
        .errors
        .iter()
        .filter(|i| i.code == "required")
        .map(|i| i.path.as_str())
        .collect();
    assert_eq!(required, vec!["#/bar"]);
}

#[test]
fn sibling_reference_resolves_into_endpoint_and_query() {
    let mut form = Form::new(&model()).unwrap();
    form.init();

    let events = form.set_value(path("bar"), json!("xyz"));
    let requests = fetch_requests(&events);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].field, path("foo"));
    assert_eq!(requests[0].source.url, "xyz/api/");
    assert_eq!(requests[0].source.query.get("plan"), Some(&"xyz".to_string()));
    assert!(!form.is_blocked(&path("foo")));

    // unblocked: foo is now subject to required again
    let report = form.validation_result();
    assert!(report.errors.iter().any(|i| i.path == "#/foo"));
}

#[test]
fn validation_withheld_while_fetch_in_flight() {
    let mut form = Form::new(&model()).unwrap();
    form.init();

    let events = form.set_value(path("bar"), json!("xyz"));
    let requests = fetch_requests(&events);
    assert_eq!(requests.len(), 1);
    // the report waits for the fetch to settle
    assert!(validations(&events).is_empty());

    let ticket = requests[0].ticket.clone();
    let events = form.complete_fetch(&ticket, Ok(json!([{"label": "A", "value": "a"}])));
    assert_eq!(validations(&events).len(), 1);
    assert_eq!(
        form.records(&path("foo")),
        Some(&[json!({"label": "A", "value": "a"})][..])
    );
}

#[test]
fn stale_result_is_discarded() {
    let mut form = Form::new(&model()).unwrap();
    form.init();

    let first = form.set_value(path("bar"), json!("first"));
    let first_ticket = fetch_requests(&first)[0].ticket.clone();

    let second = form.set_value(path("bar"), json!("second"));
    let second_ticket = fetch_requests(&second)[0].ticket.clone();

    // the superseded result produces nothing and stores nothing
    let events = form.complete_fetch(&first_ticket, Ok(json!([{"value": "old"}])));
    assert!(events.is_empty());
    assert_eq!(form.records(&path("foo")), None);

    let events = form.complete_fetch(&second_ticket, Ok(json!([{"value": "new"}])));
    assert!(!events.is_empty());
    assert_eq!(form.records(&path("foo")), Some(&[json!({"value": "new"})][..]));
}

#[test]
fn clearing_the_reference_invalidates_the_in_flight_fetch() {
    let mut form = Form::new(&model()).unwrap();
    form.init();

    let events = form.set_value(path("bar"), json!("xyz"));
    let ticket = fetch_requests(&events)[0].ticket.clone();

    // removing bar re-blocks foo before the fetch lands
    form.set_value(path("bar"), json!(null));
    assert!(form.is_blocked(&path("foo")));

    let events = form.complete_fetch(&ticket, Ok(json!([{"value": "a"}])));
    assert!(events.is_empty());
    assert_eq!(form.records(&path("foo")), None);
}

#[test]
fn fetch_failure_surfaces_field_errors() {
    let mut form = Form::new(&model()).unwrap();
    form.init();

    let events = form.set_value(path("bar"), json!("xyz"));
    let ticket = fetch_requests(&events)[0].ticket.clone();

    let events = form.complete_fetch(&ticket, Err(FetchFailure::new("service unavailable")));
    let error_event = events.iter().find_map(|e| match e {
        FormEvent::Error(field, errors) => Some((field, errors)),
        _ => None,
    });
    let (field, errors) = error_event.expect("expected an error event");
    assert_eq!(*field, path("foo"));
    assert_eq!(errors[0].message, "service unavailable");

    // errors also land in the state snapshot
    assert!(form.state().errors.contains_key(&path("foo")));
}

#[test]
fn touched_gating_hides_untouched_errors_until_show_all() {
    let mut form = Form::new(&model()).unwrap();
    let events = form.init();

    // nothing touched yet, the visible report is clean
    let visible = validations(&events);
    assert_eq!(visible.len(), 1);
    assert!(visible[0].errors.is_empty());

    // the full report still has the missing required field
    assert!(!form.validation_result().errors.is_empty());

    let events = form.set_show_all_errors(true);
    let visible = validations(&events);
    assert_eq!(visible.len(), 1);
    assert!(visible[0].errors.iter().any(|i| i.path == "#/bar"));
}

#[test]
fn response_records_path_selects_nested_array() {
    let model = json!({
        "type": "object",
        "properties": {
            "plan": {
                "type": "string",
                "endpoint": "/api/plans/",
                "recordsPath": "data.items"
            }
        }
    });
    let mut form = Form::new(&model).unwrap();
    let events = form.init();

    // literal endpoint fetches right away
    let requests = fetch_requests(&events);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].source.url, "/api/plans/");

    let ticket = requests[0].ticket.clone();
    let response = json!({"data": {"items": [{"value": "basic"}, {"value": "pro"}]}});
    form.complete_fetch(&ticket, Ok(response));
    assert_eq!(
        form.records(&path("plan")).map(<[Value]>::len),
        Some(2)
    );
}

#[test]
fn response_without_record_array_fails_the_field() {
    let model = json!({
        "type": "object",
        "properties": {
            "plan": {
                "type": "string",
                "endpoint": "/api/plans/",
                "recordsPath": "data.items"
            }
        }
    });
    let mut form = Form::new(&model).unwrap();
    let events = form.init();
    let ticket = fetch_requests(&events)[0].ticket.clone();

    let events = form.complete_fetch(&ticket, Ok(json!({"data": {}})));
    assert!(events
        .iter()
        .any(|e| matches!(e, FormEvent::Error(field, _) if *field == path("plan"))));
}
