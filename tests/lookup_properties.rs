//! Property tests for the lookup step
//!
//! Generates small element collections over a narrow name alphabet so that
//! matches, misses, and duplicate names all occur frequently.

use elementstep::runtime::element::TestElement;
use elementstep::runtime::model::{Model, StepInstance};
use elementstep::runtime::state::StateValue;
use elementstep::{Runtime, RuntimeConfig};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("A".to_string()),
        Just("B".to_string()),
        Just("ABC".to_string()),
        "[a-c]{1,2}",
    ]
}

fn rows() -> impl Strategy<Value = Vec<(String, f64)>> {
    prop::collection::vec((name(), -1.0e6..1.0e6f64), 0..12)
}

fn runtime(target: &str, rows: &[(String, f64)], initial: f64) -> Runtime {
    let mut model = Model::new();
    let mut ids = Vec::new();
    for (i, (name, value)) in rows.iter().enumerate() {
        let id = format!("E{}", i);
        model.add_element(TestElement::new(id.clone(), name.clone(), *value));
        ids.push(id);
    }
    model
        .add_state("Target", StateValue::Text(target.to_string()))
        .add_state("Response", StateValue::Real(initial))
        .set_group("Rows", ids)
        .add_step(
            StepInstance::new("Lookup", "TestStep")
                .with("TestElementName", "Target")
                .with("TestElements", "Rows")
                .with("ResponseValue", "Response"),
        );
    Runtime::new(RuntimeConfig::default(), model).unwrap()
}

proptest! {
    #[test]
    fn first_match_or_zero(target in name(), rows in rows(), initial in -10.0..10.0f64) {
        let mut runtime = runtime(&target, &rows, initial);
        let outcome = runtime.visit("Lookup").unwrap();

        let first = rows.iter().position(|(n, _)| *n == target);
        let expected = first.map(|i| rows[i].1).unwrap_or(0.0);
        let touched = first.map(|i| i + 1).unwrap_or(rows.len());

        prop_assert_eq!(runtime.model().states.real("Response"), Some(expected));
        prop_assert_eq!(outcome.rows_acquired, touched);
        prop_assert_eq!(outcome.rows_released, touched);
        prop_assert_eq!(outcome.records.len(), 1);
        prop_assert_eq!(&outcome.records[0].target, &target);
        prop_assert_eq!(outcome.records[0].value, expected);
        prop_assert_eq!(outcome.records[0].matched_row, first);
    }

    #[test]
    fn visits_are_idempotent(target in name(), rows in rows()) {
        let mut runtime = runtime(&target, &rows, 0.0);

        runtime.visit("Lookup").unwrap();
        let once = runtime.model().states.real("Response");
        runtime.visit("Lookup").unwrap();
        let twice = runtime.model().states.real("Response");

        prop_assert_eq!(once, twice);
    }
}
