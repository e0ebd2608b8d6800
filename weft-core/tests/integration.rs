//! Integration tests for the reactive data model.
//!
//! These exercise the pieces together: records wrapping nested data,
//! computed properties cascading through each other, sequences publishing
//! structural events, and the introspection surface a rendering layer
//! builds on.

use std::cell::Cell;
use std::rc::Rc;

use weft_core::{
    computed, computed_with_setter, ObservableMap, Registry, Snapshot, Value, CHANNEL_ADD,
};

/// A computed property reading another computed property: the inner
/// evaluation gets its own tracking frame, so the outer property depends on
/// the computed *property*, not on the inner getter's own reads.
#[test]
fn computed_properties_cascade() {
    let person = ObservableMap::from_entries([
        ("firstName", Value::from("chun")),
        ("lastName", Value::from("shang")),
        (
            "fullName",
            computed_with_setter(
                |scope| {
                    let first = scope.get("firstName");
                    let last = scope.get("lastName");
                    Value::from(format!(
                        "{} {}",
                        first.as_str().unwrap_or(""),
                        last.as_str().unwrap_or("")
                    ))
                },
                |scope, new, _old| {
                    let new = new.as_str().unwrap_or("");
                    let mut chips = new.splitn(2, ' ');
                    let first = chips.next().unwrap_or("");
                    let last = chips.next().unwrap_or("");
                    scope.set("firstName", Value::from(first)).unwrap();
                    scope.set("lastName", Value::from(last)).unwrap();
                },
            )
            .into(),
        ),
        ("street", Value::from("wangjing east road")),
        (
            "address",
            computed(|scope| {
                let full = scope.get("fullName");
                let street = scope.get("street");
                Value::from(format!(
                    "{}, {}",
                    full.as_str().unwrap_or(""),
                    street.as_str().unwrap_or("")
                ))
            })
            .into(),
        ),
    ]);

    let full_name_publishes = Rc::new(Cell::new(0));
    let count = full_name_publishes.clone();
    person.subscribe("fullName", move |_| count.set(count.get() + 1));

    assert_eq!(person.get("fullName"), Value::from("chun shang"));
    assert_eq!(
        person.get("address"),
        Value::from("chun shang, wangjing east road")
    );

    // the outer computed depends on the computed property itself, not on
    // the firstName/lastName reads made inside the nested evaluation
    assert_eq!(
        person.descriptor("address").unwrap().dependencies(),
        vec!["fullName".to_owned(), "street".to_owned()]
    );

    // one dependency write, one publish on the computed's own channel
    person.set("firstName", Value::from("vivid")).unwrap();
    assert_eq!(person.get("fullName"), Value::from("vivid shang"));
    assert_eq!(
        person.get("address"),
        Value::from("vivid shang, wangjing east road")
    );
    assert_eq!(full_name_publishes.get(), 1);

    // writing through the setter: the dependency cascade publishes once
    // (lastName changes), then the descriptor force-publishes its own change
    person.set("fullName", Value::from("vivid fe")).unwrap();
    assert_eq!(person.get("firstName"), Value::from("vivid"));
    assert_eq!(person.get("lastName"), Value::from("fe"));
    assert_eq!(full_name_publishes.get(), 3);
}

#[test]
fn nested_data_forms_a_scope_tree() {
    let state = ObservableMap::new(Value::from(serde_json::json!({
        "title": "todos",
        "entries": [
            { "label": "write tests", "done": false },
            { "label": "ship", "done": false }
        ]
    })))
    .unwrap();

    let entries = state.get("entries");
    let entries = entries.as_seq().unwrap();

    // items wrapped at construction time belong to the owning record
    let first = entries.get(0).unwrap();
    let first = first.as_map().unwrap();
    assert!(Rc::ptr_eq(&first.parent().unwrap(), &state));

    // items inserted later are wrapped under the same scope
    entries.push(Value::from(serde_json::json!({ "label": "relax", "done": false })));
    let last = entries.get(2).unwrap();
    let last = last.as_map().unwrap();
    assert!(Rc::ptr_eq(&last.parent().unwrap(), &state));
}

/// A presentation binding subscribing a sequence of records: mutating a
/// nested record publishes on that record's channel, while structural
/// changes publish on the sequence.
#[test]
fn nested_records_stay_independently_observable() {
    let state = ObservableMap::new(Value::from(serde_json::json!({
        "entries": [{ "label": "a", "done": false }]
    })))
    .unwrap();

    let entries = state.get("entries");
    let entries = entries.as_seq().unwrap();

    let structural = Rc::new(Cell::new(0));
    let count = structural.clone();
    entries.subscribe(CHANNEL_ADD, move |_| count.set(count.get() + 1));

    let first = entries.get(0).unwrap();
    let first = first.as_map().unwrap().clone();

    let item_changes = Rc::new(Cell::new(0));
    let count = item_changes.clone();
    first.subscribe("done", move |_| count.set(count.get() + 1));

    first.set("done", Value::from(true)).unwrap();
    assert_eq!(item_changes.get(), 1);
    assert_eq!(structural.get(), 0);

    entries.push(Value::from(serde_json::json!({ "label": "b", "done": false })));
    assert_eq!(structural.get(), 1);
    assert_eq!(item_changes.get(), 1);
}

/// The introspection path a rendering layer uses: run the render function
/// under detection, then subscribe to exactly the properties it read.
#[test]
fn detect_reports_what_a_binding_read() {
    let state = ObservableMap::from_entries([
        ("visible", Value::from(true)),
        ("label", Value::from("ok")),
        ("tooltip", Value::from("unused")),
    ]);

    let (rendered, deps) = state.detect(|scope| {
        if scope.get("visible").as_bool().unwrap_or(false) {
            scope.get("label")
        } else {
            Value::Null
        }
    });

    assert_eq!(rendered, Value::from("ok"));
    assert_eq!(deps, vec!["visible".to_owned(), "label".to_owned()]);

    let refreshes = Rc::new(Cell::new(0));
    for dep in &deps {
        let count = refreshes.clone();
        state.subscribe(dep, move |_| count.set(count.get() + 1));
    }

    state.set("label", Value::from("changed")).unwrap();
    state.set("tooltip", Value::from("still unused")).unwrap();
    assert_eq!(refreshes.get(), 1);
}

#[test]
fn registry_resolves_bindings_by_identity() {
    let registry = Registry::new();

    let state = ObservableMap::new(Value::from(serde_json::json!({
        "profile": { "name": "spring" }
    })))
    .unwrap();
    registry.register(&state);

    let profile = state.get("profile");
    let profile = profile.as_map().unwrap().clone();
    registry.register(&profile);

    // a visual node holding only the id can find its record again
    let resolved = registry.resolve(profile.id()).unwrap();
    assert_eq!(resolved.get("name"), Value::from("spring"));

    // entries are weak: once every strong reference is gone, resolution
    // fails and prune clears the table
    drop(resolved);
    drop(profile);
    drop(state);
    registry.prune();
    assert!(registry.is_empty());
}

#[test]
fn snapshot_round_trips_through_json() {
    let source = serde_json::json!({
        "name": "spring",
        "points": { "javascript": 60, "html": 60 },
        "tags": ["engineer", "front-end"],
        "scores": [1, 2, [3, 4]]
    });

    let state = ObservableMap::new(Value::from(source.clone())).unwrap();
    assert_eq!(state.to_plain().to_json(), source);

    // mutations are reflected in later snapshots
    state
        .get("points")
        .as_map()
        .unwrap()
        .set("css", Value::from(60))
        .unwrap();
    let snapshot = state.to_plain().to_json();
    assert_eq!(snapshot["points"]["css"], serde_json::json!(60));
}

/// Sequence events and record publishes interleave synchronously on the
/// caller's stack; a subscriber observes every step in order.
#[test]
fn notifications_are_synchronous_and_ordered() {
    let state = ObservableMap::from_entries([("items", Value::List(Vec::new()))]);
    let items = state.get("items");
    let items = items.as_seq().unwrap().clone();

    let order = Rc::new(std::cell::RefCell::new(Vec::new()));

    let log = order.clone();
    items.subscribe(CHANNEL_ADD, move |splice| {
        log.borrow_mut().push(format!("add@{}", splice.index));
    });

    let log = order.clone();
    state.subscribe("status", move |change| {
        log.borrow_mut()
            .push(format!("status={}", change.new.as_str().unwrap_or("")));
    });

    items.extend([Value::from(1), Value::from(2)]);
    state.set("status", Value::from("filled")).unwrap();

    assert_eq!(
        order.borrow().as_slice(),
        &[
            "add@0".to_owned(),
            "add@1".to_owned(),
            "status=filled".to_owned()
        ]
    );
}
