//! Test elements: named scalar holders referenced from repeat-group rows

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::{SchemaResult, StorageError};
use super::schema::PropertySchema;
use super::step::NamedElement;

/// Model-level instance name of an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    /// Create a new element id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Definition of an element type
pub trait ElementDefinition: Send + Sync {
    /// Type name, without spaces
    fn name(&self) -> &'static str;

    /// Short description
    fn description(&self) -> &'static str;

    /// Stable unique id
    fn unique_id(&self) -> Uuid;

    /// Declare the properties of each element instance
    fn define_schema(&self, schema: &mut PropertySchema) -> SchemaResult<()>;
}

/// The `TestElement` element type
#[derive(Debug, Default, Clone, Copy)]
pub struct TestElementDefinition;

impl TestElementDefinition {
    /// Unique id of the `TestElement` definition
    pub const ID: Uuid = Uuid::from_u128(0x7c4e_1a52_93d0_4b6f_a1e8_5f2c_0d9b_3e61);

    /// Type name of the `TestElement` definition
    pub const NAME: &'static str = "TestElement";
}

impl ElementDefinition for TestElementDefinition {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Holds a name and a real value for lookup by steps."
    }

    fn unique_id(&self) -> Uuid {
        Self::ID
    }

    fn define_schema(&self, schema: &mut PropertySchema) -> SchemaResult<()> {
        schema.add_string("TestName", "")?.required = true;
        schema.add_real("TestValue", 0.0)?;
        Ok(())
    }
}

fn test_element_definition() -> Uuid {
    TestElementDefinition::ID
}

/// An element instance with a name and a real value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestElement {
    /// Instance id rows refer to
    pub id: ElementId,
    /// Definition this instance belongs to
    #[serde(default = "test_element_definition")]
    pub definition: Uuid,
    /// Name matched by lookups
    pub name: String,
    /// Value copied on a match
    pub value: f64,
}

impl TestElement {
    /// Create a `TestElement` instance
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: f64) -> Self {
        Self {
            id: ElementId::new(id),
            definition: TestElementDefinition::ID,
            name: name.into(),
            value,
        }
    }

    /// Whether this instance is of the `TestElement` definition
    pub fn is_test_element(&self) -> bool {
        self.definition == TestElementDefinition::ID
    }
}

impl NamedElement for TestElement {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> f64 {
        self.value
    }
}

/// Element instances in declaration order
///
/// Serialized as a list; a list repeating an id is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TestElement>", into = "Vec<TestElement>")]
pub struct ElementStore {
    elements: Vec<TestElement>,
}

impl ElementStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, replacing any existing instance with the same id
    pub fn insert(&mut self, element: TestElement) {
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
    }

    /// Remove an element by id
    pub fn remove(&mut self, id: &ElementId) -> Option<TestElement> {
        let index = self.elements.iter().position(|e| &e.id == id)?;
        Some(self.elements.remove(index))
    }

    /// Look up an element
    pub fn get(&self, id: &ElementId) -> Option<&TestElement> {
        self.elements.iter().find(|e| &e.id == id)
    }

    /// Look up an element for modification
    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut TestElement> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl TryFrom<Vec<TestElement>> for ElementStore {
    type Error = StorageError;

    fn try_from(elements: Vec<TestElement>) -> Result<Self, Self::Error> {
        for (i, element) in elements.iter().enumerate() {
            if elements[..i].iter().any(|e| e.id == element.id) {
                return Err(StorageError::DuplicateElement(element.id.to_string()));
            }
        }
        Ok(Self { elements })
    }
}

impl From<ElementStore> for Vec<TestElement> {
    fn from(store: ElementStore) -> Self {
        store.elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_by_id() {
        let mut store = ElementStore::new();
        store.insert(TestElement::new("E1", "ABC", 1.0));
        store.insert(TestElement::new("E1", "ABC", 2.0));
        store.insert(TestElement::new("E2", "XYZ", 3.0));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&ElementId::new("E1")).unwrap().value, 2.0);
    }

    #[test]
    fn test_definition_defaults_when_deserializing() {
        let element: TestElement =
            serde_json::from_str(r#"{"id":"E1","name":"ABC","value":4.0}"#).unwrap();
        assert!(element.is_test_element());
    }

    #[test]
    fn test_duplicate_ids_rejected_when_deserializing() {
        let json = r#"[
            {"id":"E1","name":"ABC","value":1.0},
            {"id":"E1","name":"XYZ","value":2.0}
        ]"#;
        let err = serde_json::from_str::<ElementStore>(json).unwrap_err();
        assert!(err.to_string().contains("Element 'E1' is defined more than once"));

        let store: ElementStore = serde_json::from_str(
            r#"[{"id":"E1","name":"ABC","value":1.0},{"id":"E2","name":"ABC","value":2.0}]"#,
        )
        .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_schema_declares_name_and_value() {
        let mut schema = PropertySchema::new();
        TestElementDefinition.define_schema(&mut schema).unwrap();
        assert!(schema.get("TestName").unwrap().required);
        assert!(schema.get("TestValue").is_some());
    }
}
