//! Step and element definition catalog
//!
//! Provides a global catalog for registering definitions prior to runtime
//! startup. Each runtime clones an immutable snapshot of the catalog so
//! step instantiation does not observe later registrations.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

use super::context::ExecutionContext;
use super::element::{ElementDefinition, TestElementDefinition};
use super::error::{Result, SchemaError, SchemaResult};
use super::model::{Model, PropertyValues};
use super::property::{self, ELEMENT, ELEMENTS, RESPONSE, TARGET_NAME};
use super::schema::{Fingerprint, PropertySchema, fingerprint};
use super::step::{ElementLookupStep, Step};

/// A step instantiated against the host model
pub type HostStep = dyn for<'m> Step<ExecutionContext<'m>>;

/// Definition of a step type
pub trait StepDefinition: Send + Sync {
    /// Type name, without spaces
    fn name(&self) -> &'static str;

    /// Short description of what the step does
    fn description(&self) -> &'static str;

    /// Stable unique id
    fn unique_id(&self) -> Uuid;

    /// Number of exits out of the step (1 or 2)
    fn number_of_exits(&self) -> u8;

    /// Declare the properties of each placed step
    fn define_schema(&self, schema: &mut PropertySchema) -> SchemaResult<()>;

    /// Create a step instance from its configured property values
    fn create_step(&self, properties: &PropertyValues, model: &Model) -> Result<Box<HostStep>>;
}

/// The `TestStep` lookup step
#[derive(Debug, Default, Clone, Copy)]
pub struct ElementLookupStepDefinition;

impl ElementLookupStepDefinition {
    /// Unique id of the `TestStep` definition
    pub const ID: Uuid = Uuid::from_u128(0x2b21_94b0_5ea7_4e63_ae52_5080_c125_e18b);

    /// Type name of the `TestStep` definition
    pub const NAME: &'static str = "TestStep";
}

impl StepDefinition for ElementLookupStepDefinition {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Looks up a test element by name and copies its value into a state."
    }

    fn unique_id(&self) -> Uuid {
        Self::ID
    }

    fn number_of_exits(&self) -> u8 {
        1
    }

    fn define_schema(&self, schema: &mut PropertySchema) -> SchemaResult<()> {
        schema.add_expression(TARGET_NAME, "\"ABC\"")?.required = true;

        let mut rows = PropertySchema::new();
        rows.add_element(ELEMENT, TestElementDefinition::ID)?;
        schema.add_repeat_group(ELEMENTS, rows)?;

        schema.add_state(RESPONSE)?.required = true;
        Ok(())
    }

    fn create_step(&self, properties: &PropertyValues, model: &Model) -> Result<Box<HostStep>> {
        let mut schema = PropertySchema::new();
        self.define_schema(&mut schema)?;
        let bindings = property::resolve_bindings(&schema, properties, model)?;
        Ok(Box::new(ElementLookupStep::new(bindings)))
    }
}

/// Global catalog of definitions.
pub struct DefinitionCatalog {
    steps: RwLock<HashMap<String, Arc<dyn StepDefinition>>>,
    elements: RwLock<HashMap<String, Arc<dyn ElementDefinition>>>,
}

static CATALOG: LazyLock<DefinitionCatalog> = LazyLock::new(DefinitionCatalog::with_builtins);

impl DefinitionCatalog {
    fn with_builtins() -> Self {
        let mut steps: HashMap<String, Arc<dyn StepDefinition>> = HashMap::new();
        steps.insert(
            ElementLookupStepDefinition::NAME.to_string(),
            Arc::new(ElementLookupStepDefinition),
        );
        let mut elements: HashMap<String, Arc<dyn ElementDefinition>> = HashMap::new();
        elements.insert(
            TestElementDefinition::NAME.to_string(),
            Arc::new(TestElementDefinition),
        );
        Self {
            steps: RwLock::new(steps),
            elements: RwLock::new(elements),
        }
    }

    /// Access the global catalog singleton.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    /// Register a step definition; names and unique ids must be unused.
    pub fn register_step(&self, definition: Arc<dyn StepDefinition>) -> SchemaResult<()> {
        let mut steps = self.steps.write();
        if steps.contains_key(definition.name())
            || steps.values().any(|d| d.unique_id() == definition.unique_id())
        {
            return Err(SchemaError::DuplicateDefinition(definition.name().to_string()));
        }
        steps.insert(definition.name().to_string(), definition);
        Ok(())
    }

    /// Register an element definition; names and unique ids must be unused.
    pub fn register_element(&self, definition: Arc<dyn ElementDefinition>) -> SchemaResult<()> {
        let mut elements = self.elements.write();
        if elements.contains_key(definition.name())
            || elements.values().any(|d| d.unique_id() == definition.unique_id())
        {
            return Err(SchemaError::DuplicateDefinition(definition.name().to_string()));
        }
        elements.insert(definition.name().to_string(), definition);
        Ok(())
    }

    /// Produce an immutable snapshot for a runtime instance.
    pub fn snapshot(&self) -> DefinitionRegistry {
        DefinitionRegistry {
            steps: Arc::new(self.steps.read().clone()),
            elements: Arc::new(self.elements.read().clone()),
        }
    }
}

/// Immutable runtime view of the definition catalog.
#[derive(Clone)]
pub struct DefinitionRegistry {
    steps: Arc<HashMap<String, Arc<dyn StepDefinition>>>,
    elements: Arc<HashMap<String, Arc<dyn ElementDefinition>>>,
}

impl DefinitionRegistry {
    /// Look up a step definition by name
    pub fn step(&self, name: &str) -> SchemaResult<&Arc<dyn StepDefinition>> {
        self.steps
            .get(name)
            .ok_or_else(|| SchemaError::UnknownDefinition(name.to_string()))
    }

    /// Look up an element definition by name
    pub fn element(&self, name: &str) -> SchemaResult<&Arc<dyn ElementDefinition>> {
        self.elements
            .get(name)
            .ok_or_else(|| SchemaError::UnknownDefinition(name.to_string()))
    }

    /// Registered step definition names, sorted
    pub fn step_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered element definition names, sorted
    pub fn element_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Schema of a step or element definition
    pub fn schema(&self, name: &str) -> SchemaResult<PropertySchema> {
        let mut schema = PropertySchema::new();
        if let Some(step) = self.steps.get(name) {
            step.define_schema(&mut schema)?;
        } else {
            self.element(name)?.define_schema(&mut schema)?;
        }
        Ok(schema)
    }

    /// Fingerprint of a step or element definition's schema
    pub fn fingerprint(&self, name: &str) -> SchemaResult<Fingerprint> {
        let unique_id = match self.steps.get(name) {
            Some(step) => step.unique_id(),
            None => self.element(name)?.unique_id(),
        };
        Ok(fingerprint(name, unique_id, &self.schema(name)?))
    }

    /// Compare a model's recorded fingerprints against the registered schemas
    pub fn validate_fingerprints(&self, model: &Model) -> SchemaResult<()> {
        for (name, found) in &model.fingerprints {
            let expected = self.fingerprint(name)?;
            if &expected != found {
                return Err(SchemaError::FingerprintMismatch {
                    definition: name.clone(),
                    expected,
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }
}
