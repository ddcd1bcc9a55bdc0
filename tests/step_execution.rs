//! Integration tests for lookup step execution
//!
//! Tests the flow from model construction through a token visit to the
//! response state and trace log.

use elementstep::runtime::element::TestElement;
use elementstep::runtime::model::{Model, StepInstance};
use elementstep::runtime::state::StateValue;
use elementstep::runtime::step::ExitType;
use elementstep::{Runtime, RuntimeConfig};

fn lookup_model(target: &str, rows: &[(&str, f64)]) -> Model {
    let mut model = Model::new();
    let mut ids = Vec::new();
    for (i, (name, value)) in rows.iter().enumerate() {
        let id = format!("E{}", i);
        model.add_element(TestElement::new(id.clone(), *name, *value));
        ids.push(id);
    }
    model
        .add_state("Response", StateValue::Real(-1.0))
        .set_group("Rows", ids)
        .add_step(
            StepInstance::new("Lookup", "TestStep")
                .with("TestElementName", target)
                .with("TestElements", "Rows")
                .with("ResponseValue", "Response"),
        );
    model
}

fn response(runtime: &Runtime) -> f64 {
    runtime.model().states.real("Response").unwrap()
}

#[test]
fn test_first_match_wins() {
    let model = lookup_model("\"ABC\"", &[("XYZ", 5.0), ("ABC", 42.0), ("ABC", 99.0)]);
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    let outcome = runtime.visit("Lookup").unwrap();

    assert_eq!(outcome.exit, ExitType::FirstExit);
    assert_eq!(response(&runtime), 42.0);
    assert_eq!(outcome.rows_acquired, 2);
    assert_eq!(outcome.rows_released, 2);

    let entry = runtime.trace().last().unwrap();
    assert_eq!(entry.step, "Lookup");
    assert_eq!(entry.record.target, "ABC");
    assert_eq!(entry.record.value, 42.0);
    assert_eq!(entry.record.matched_row, Some(1));
    assert_eq!(entry.record.message, "The value for 'ABC' is '42'.");
}

#[test]
fn test_miss_writes_zero() {
    let model = lookup_model("\"Missing\"", &[("A", 1.0)]);
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    let outcome = runtime.visit("Lookup").unwrap();

    assert_eq!(response(&runtime), 0.0);
    assert_eq!(outcome.rows_acquired, 1);
    assert_eq!(outcome.rows_released, 1);
    assert_eq!(outcome.records[0].matched_row, None);
}

#[test]
fn test_empty_name_is_matchable() {
    let model = lookup_model("\"\"", &[("", 7.5)]);
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    runtime.visit("Lookup").unwrap();

    assert_eq!(response(&runtime), 7.5);
}

#[test]
fn test_empty_collection() {
    let model = lookup_model("\"ABC\"", &[]);
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    let outcome = runtime.visit("Lookup").unwrap();

    assert_eq!(response(&runtime), 0.0);
    assert_eq!(outcome.rows_acquired, 0);
}

#[test]
fn test_unset_group_has_no_rows() {
    let mut model = Model::new();
    model.add_state("Response", StateValue::Real(3.0)).add_step(
        StepInstance::new("Lookup", "TestStep").with("ResponseValue", "Response"),
    );
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    let outcome = runtime.visit("Lookup").unwrap();

    assert_eq!(response(&runtime), 0.0);
    assert_eq!(outcome.records[0].target, "ABC");
}

#[test]
fn test_repeated_visits_are_idempotent() {
    let model = lookup_model("\"ABC\"", &[("XYZ", 5.0), ("ABC", 42.0)]);
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    let outcomes = runtime.run("Lookup", 3).unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(response(&runtime), 42.0);
    assert!(outcomes.iter().all(|o| o.records[0].value == 42.0));
    assert_eq!(runtime.visits(), 3);
    let visits: Vec<u64> = runtime.trace().entries().map(|e| e.visit).collect();
    assert_eq!(visits, vec![1, 2, 3]);
}

#[test]
fn test_row_count_change_between_visits() {
    let model = lookup_model("\"ABC\"", &[("XYZ", 5.0), ("ABC", 42.0)]);
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    runtime.visit("Lookup").unwrap();
    assert_eq!(response(&runtime), 42.0);

    runtime.model_mut().group_mut("Rows").unwrap().truncate(1);
    let outcome = runtime.visit("Lookup").unwrap();
    assert_eq!(response(&runtime), 0.0);
    assert_eq!(outcome.rows_acquired, 1);

    runtime
        .model_mut()
        .add_element(TestElement::new("Late", "ABC", 11.0));
    runtime
        .model_mut()
        .group_mut("Rows")
        .unwrap()
        .push(elementstep::runtime::element::ElementId::new("Late"));
    runtime.visit("Lookup").unwrap();
    assert_eq!(response(&runtime), 11.0);
}

#[test]
fn test_target_follows_state_between_visits() {
    let mut model = lookup_model("Prefix + Index", &[("Item1", 10.0), ("Item2", 20.0)]);
    model
        .add_state("Prefix", StateValue::Text("Item".into()))
        .add_state("Index", StateValue::Real(1.0));
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    runtime.visit("Lookup").unwrap();
    assert_eq!(response(&runtime), 10.0);

    runtime.model_mut().states.set_real("Index", 2.0);
    runtime.visit("Lookup").unwrap();
    assert_eq!(response(&runtime), 20.0);

    runtime.model_mut().states.set_real("Index", 3.0);
    runtime.visit("Lookup").unwrap();
    assert_eq!(response(&runtime), 0.0);
}

#[test]
fn test_element_edits_are_seen() {
    let model = lookup_model("\"ABC\"", &[("ABC", 1.0)]);
    let mut runtime = Runtime::new(RuntimeConfig::default(), model).unwrap();

    let id = elementstep::runtime::element::ElementId::new("E0");
    runtime.model_mut().elements.get_mut(&id).unwrap().value = 8.0;
    runtime.visit("Lookup").unwrap();
    assert_eq!(response(&runtime), 8.0);

    runtime.model_mut().elements.get_mut(&id).unwrap().name = "abc".into();
    runtime.visit("Lookup").unwrap();
    assert_eq!(response(&runtime), 0.0);
}
