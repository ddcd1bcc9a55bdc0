//! Host property readers and binding resolution
//!
//! Each reader implements one collaborator trait of the lookup step against
//! [`ExecutionContext`]. [`resolve_bindings`] validates a placed step's
//! property values once, at construction, and produces typed readers; nothing
//! is looked up by name during execution except the model entries the
//! readers point at.

use tracing::debug;
use uuid::Uuid;

use super::context::{ExecutionContext, RowLedger};
use super::element::{ElementId, TestElement, TestElementDefinition};
use super::error::{BindingError, BindingResult, StepError, StepResult};
use super::expression::Expression;
use super::model::{Model, PropertyValues};
use super::schema::{PropertyKind, PropertySchema};
use super::state::StateValue;
use super::step::{NameExpression, NamedElement, RowSource, StateSink, StepBindings};

/// Target-name expression property
pub const TARGET_NAME: &str = "TestElementName";
/// Repeat group of element references
pub const ELEMENTS: &str = "TestElements";
/// Element reference inside each `TestElements` row
pub const ELEMENT: &str = "TestElement";
/// Response state property
pub const RESPONSE: &str = "ResponseValue";

/// Bindings of a lookup step placed in a host model
pub type HostBindings =
    StepBindings<ExpressionPropertyReader, RepeatingPropertyReader, StatePropertyReader>;

/// Reads an expression property by evaluating it against current state
#[derive(Debug, Clone)]
pub struct ExpressionPropertyReader {
    expression: Expression,
}

impl ExpressionPropertyReader {
    /// Wrap a parsed expression
    pub fn new(expression: Expression) -> Self {
        Self { expression }
    }

    /// The bound expression
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl<'m> NameExpression<ExecutionContext<'m>> for ExpressionPropertyReader {
    fn evaluate(&self, ctx: &ExecutionContext<'m>) -> StepResult<String> {
        Ok(self.expression.evaluate(&ctx.model().states)?.to_string())
    }
}

/// Reads rows of a repeat group of element references
#[derive(Debug, Clone)]
pub struct RepeatingPropertyReader {
    group: Option<String>,
    definition: Uuid,
    definition_name: String,
}

impl RepeatingPropertyReader {
    /// Reader over `group`, accepting elements of `definition`
    ///
    /// A reader with no group always has zero rows.
    pub fn new(group: Option<String>, definition: Uuid, definition_name: impl Into<String>) -> Self {
        Self {
            group,
            definition,
            definition_name: definition_name.into(),
        }
    }

    /// Name of the bound repeat group
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn rows<'a>(&self, model: &'a Model) -> StepResult<&'a [ElementId]> {
        match &self.group {
            Some(name) => model
                .group(name)
                .ok_or_else(|| StepError::UnknownGroup(name.clone())),
            None => Ok(&[]),
        }
    }
}

impl<'m> RowSource<ExecutionContext<'m>> for RepeatingPropertyReader {
    type Row<'r>
        = ElementRow<'r>
    where
        Self: 'r,
        ExecutionContext<'m>: 'r;

    fn count(&self, ctx: &ExecutionContext<'m>) -> StepResult<usize> {
        Ok(self.rows(ctx.model())?.len())
    }

    fn row<'r>(&'r self, index: usize, ctx: &'r ExecutionContext<'m>) -> StepResult<ElementRow<'r>> {
        let model = ctx.model();
        let rows = self.rows(model)?;
        let id = rows.get(index).ok_or(StepError::RowOutOfRange {
            index,
            count: rows.len(),
        })?;
        let element = model
            .elements
            .get(id)
            .ok_or_else(|| StepError::UnknownElement(id.to_string()))?;
        if element.definition != self.definition {
            return Err(StepError::WrongElementType {
                element: id.to_string(),
                expected: self.definition_name.clone(),
            });
        }

        Ok(ElementRow::acquire(element, ctx.ledger()))
    }
}

/// Scoped handle to one row's element; released on drop
#[derive(Debug)]
pub struct ElementRow<'r> {
    element: &'r TestElement,
    ledger: &'r RowLedger,
}

impl<'r> ElementRow<'r> {
    fn acquire(element: &'r TestElement, ledger: &'r RowLedger) -> Self {
        ledger.acquire();
        Self { element, ledger }
    }
}

impl NamedElement for ElementRow<'_> {
    fn name(&self) -> &str {
        &self.element.name
    }

    fn value(&self) -> f64 {
        self.element.value
    }
}

impl Drop for ElementRow<'_> {
    fn drop(&mut self) {
        self.ledger.release();
    }
}

/// Writes a real state
#[derive(Debug, Clone)]
pub struct StatePropertyReader {
    state: String,
}

impl StatePropertyReader {
    /// Writer for the named state
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
        }
    }

    /// Name of the bound state
    pub fn state(&self) -> &str {
        &self.state
    }
}

impl<'m> StateSink<ExecutionContext<'m>> for StatePropertyReader {
    fn write(&self, ctx: &mut ExecutionContext<'m>, value: f64) -> StepResult<()> {
        use super::state::RealWrite;

        match ctx.model_mut().states.set_real(&self.state, value) {
            RealWrite::Written => Ok(()),
            RealWrite::Missing => Err(StepError::UnknownState(self.state.clone())),
            RealWrite::NotReal => Err(StepError::NotRealState(self.state.clone())),
        }
    }
}

/// Check that every required property without a default has a value
pub fn check_required(schema: &PropertySchema, properties: &PropertyValues) -> BindingResult<()> {
    for prop in schema.iter() {
        if prop.required && prop.default.is_none() && !properties.contains_key(&prop.name) {
            return Err(BindingError::MissingProperty(prop.name.clone()));
        }
    }
    Ok(())
}

fn row_element_definition(schema: &PropertySchema) -> Uuid {
    let rows = schema.get(ELEMENTS).and_then(|p| match &p.kind {
        PropertyKind::RepeatGroup { properties } => properties.get(ELEMENT),
        _ => None,
    });
    match rows.map(|p| &p.kind) {
        Some(PropertyKind::Element { definition }) => *definition,
        _ => TestElementDefinition::ID,
    }
}

/// Resolve and validate the bindings of a placed lookup step
pub fn resolve_bindings(
    schema: &PropertySchema,
    properties: &PropertyValues,
    model: &Model,
) -> BindingResult<HostBindings> {
    check_required(schema, properties)?;

    let target_text = properties
        .get(TARGET_NAME)
        .map(String::as_str)
        .or_else(|| schema.get(TARGET_NAME).and_then(|p| p.default.as_deref()))
        .ok_or_else(|| BindingError::MissingProperty(TARGET_NAME.to_string()))?;
    let expression = Expression::parse(target_text)?;
    for state in expression.states() {
        if model.states.get(state).is_none() {
            return Err(BindingError::UnknownState(state.to_string()));
        }
    }

    let definition = row_element_definition(schema);
    let group = properties.get(ELEMENTS).cloned();
    if let Some(name) = &group {
        let rows = model
            .group(name)
            .ok_or_else(|| BindingError::UnknownGroup(name.clone()))?;
        for (row, id) in rows.iter().enumerate() {
            let element = model
                .elements
                .get(id)
                .ok_or_else(|| BindingError::UnknownElement {
                    group: name.clone(),
                    row,
                    element: id.to_string(),
                })?;
            if element.definition != definition {
                return Err(BindingError::WrongElementType {
                    element: id.to_string(),
                    expected: TestElementDefinition::NAME.to_string(),
                });
            }
        }
    }

    let response = properties
        .get(RESPONSE)
        .ok_or_else(|| BindingError::MissingProperty(RESPONSE.to_string()))?;
    match model.states.get(response) {
        Some(StateValue::Real(_)) => {}
        Some(StateValue::Text(_)) => return Err(BindingError::NotRealState(response.clone())),
        None => return Err(BindingError::UnknownState(response.clone())),
    }

    debug!(
        target_name = %expression,
        group = ?group,
        response = %response,
        "Resolved lookup step bindings"
    );

    Ok(StepBindings {
        target_name: ExpressionPropertyReader::new(expression),
        elements: RepeatingPropertyReader::new(group, definition, TestElementDefinition::NAME),
        response: StatePropertyReader::new(response.clone()),
    })
}
