//! Process model: elements, states, repeat groups, and placed steps
//!
//! The model is the host-owned data a step reads and writes. Placed steps
//! carry their configured property values as text; typed bindings are
//! resolved from them when the runtime instantiates each step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::element::{ElementId, ElementStore, TestElement};
use super::schema::Fingerprint;
use super::state::{StateStore, StateValue};

/// Configured property values of one placed step, keyed by property name
pub type PropertyValues = BTreeMap<String, String>;

/// A step placed in the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInstance {
    /// Name of the placed step, unique within the model
    pub name: String,
    /// Name of the step definition
    pub definition: String,
    /// Configured property values
    #[serde(default)]
    pub properties: PropertyValues,
}

impl StepInstance {
    /// Create a placed step with no property values
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            properties: PropertyValues::new(),
        }
    }

    /// Set a property value
    pub fn with(mut self, property: &str, value: impl Into<String>) -> Self {
        self.properties.insert(property.to_string(), value.into());
        self
    }

    /// Configured value of a property
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// Complete process model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Schema fingerprints the model was authored against, by definition name
    #[serde(default)]
    pub fingerprints: BTreeMap<String, Fingerprint>,
    /// Element instances
    #[serde(default)]
    pub elements: ElementStore,
    /// State cells
    #[serde(default)]
    pub states: StateStore,
    /// Repeat-group tables: rows of element references
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<ElementId>>,
    /// Placed steps
    #[serde(default)]
    pub steps: Vec<StepInstance>,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element instance
    pub fn add_element(&mut self, element: TestElement) -> &mut Self {
        self.elements.insert(element);
        self
    }

    /// Declare a state
    pub fn add_state(&mut self, name: &str, initial: StateValue) -> &mut Self {
        self.states.declare(name, initial);
        self
    }

    /// Define or replace a repeat group's rows
    pub fn set_group<I, S>(&mut self, name: &str, rows: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .insert(name.to_string(), rows.into_iter().map(|r| ElementId::new(r)).collect());
        self
    }

    /// Place a step
    pub fn add_step(&mut self, step: StepInstance) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Rows of a repeat group
    pub fn group(&self, name: &str) -> Option<&[ElementId]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Mutable rows of a repeat group
    pub fn group_mut(&mut self, name: &str) -> Option<&mut Vec<ElementId>> {
        self.groups.get_mut(name)
    }

    /// Find a placed step by name
    pub fn step(&self, name: &str) -> Option<&StepInstance> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// A small model with one lookup step, used by `init`
    pub fn sample() -> Self {
        let mut model = Model::new();
        model
            .add_element(TestElement::new("TestElement1", "XYZ", 5.0))
            .add_element(TestElement::new("TestElement2", "ABC", 42.0))
            .add_element(TestElement::new("TestElement3", "ABC", 99.0))
            .add_state("Response", StateValue::Real(0.0))
            .set_group("Lookups", ["TestElement1", "TestElement2", "TestElement3"])
            .add_step(
                StepInstance::new("Lookup1", "TestStep")
                    .with("TestElementName", "\"ABC\"")
                    .with("TestElements", "Lookups")
                    .with("ResponseValue", "Response"),
            );
        model
    }
}
