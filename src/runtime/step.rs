//! Element lookup step and the collaborator traits it executes against
//!
//! The step never sees the host's property system directly. It holds a typed
//! [`StepBindings`] bundle resolved at construction: a name expression, a row
//! source over the repeat group, and a sink for the response state. Each call
//! to [`ElementLookupStep::execute`] resolves the target name, scans rows in
//! order, and writes the first match (or 0.0) into the response state.

use tracing::{debug, info, trace, warn};

use super::error::StepResult;
use super::trace::TraceRecord;

/// Exit taken by a token leaving a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitType {
    /// Primary exit
    FirstExit,
    /// Alternate exit, only offered by two-exit steps
    SecondExit,
}

/// Value the response state receives when no row matches
pub const DEFAULT_RESPONSE: f64 = 0.0;

/// An element exposing a name and a scalar value
pub trait NamedElement {
    /// Element name compared against the target name
    fn name(&self) -> &str;

    /// Scalar value copied on a match
    fn value(&self) -> f64;
}

/// Context the host hands to a step for one token visit
pub trait StepContext {
    /// Record a trace line for operators
    fn trace(&mut self, record: TraceRecord);
}

/// Evaluates the configured target-name expression
pub trait NameExpression<C: ?Sized> {
    /// Evaluate against the current context and render as a string
    fn evaluate(&self, ctx: &C) -> StepResult<String>;
}

/// Enumerates the rows of a repeat group of element references
///
/// A row handle is a scoped acquisition: whatever it holds is released when
/// the handle is dropped.
pub trait RowSource<C: ?Sized> {
    /// Handle to one row's element
    type Row<'r>: NamedElement
    where
        Self: 'r,
        C: 'r;

    /// Current number of rows
    fn count(&self, ctx: &C) -> StepResult<usize>;

    /// Acquire the element referenced by row `index`
    fn row<'r>(&'r self, index: usize, ctx: &'r C) -> StepResult<Self::Row<'r>>;
}

/// Writable real-valued state cell
pub trait StateSink<C: ?Sized> {
    /// Replace the state's value
    fn write(&self, ctx: &mut C, value: f64) -> StepResult<()>;
}

/// Typed bindings captured once when a step is constructed
#[derive(Debug, Clone)]
pub struct StepBindings<N, R, S> {
    /// Target-name expression
    pub target_name: N,
    /// Repeat group of element references
    pub elements: R,
    /// Response state
    pub response: S,
}

/// A step placed in a process
pub trait Step<C: ?Sized> {
    /// Execute the step for one token visit
    fn execute(&self, ctx: &mut C) -> StepResult<ExitType>;
}

/// Copies the value of the first element whose name matches the target name
#[derive(Debug, Clone)]
pub struct ElementLookupStep<N, R, S> {
    bindings: StepBindings<N, R, S>,
}

impl<N, R, S> ElementLookupStep<N, R, S> {
    /// Create a step from resolved bindings
    pub fn new(bindings: StepBindings<N, R, S>) -> Self {
        Self { bindings }
    }

    /// Bindings this step was constructed with
    pub fn bindings(&self) -> &StepBindings<N, R, S> {
        &self.bindings
    }
}

impl<C, N, R, S> Step<C> for ElementLookupStep<N, R, S>
where
    C: StepContext + ?Sized,
    N: NameExpression<C>,
    R: RowSource<C>,
    S: StateSink<C>,
{
    fn execute(&self, ctx: &mut C) -> StepResult<ExitType> {
        let target = self.bindings.target_name.evaluate(ctx)?;
        let count = self.bindings.elements.count(ctx)?;
        debug!(target_name = %target, rows = count, "Looking up element");

        let mut response = DEFAULT_RESPONSE;
        let mut matched = None;

        for index in 0..count {
            let row = self.bindings.elements.row(index, ctx)?;
            trace!(index, name = row.name(), "Comparing row");
            if row.name() == target {
                response = row.value();
                matched = Some(index);
                break;
            }
        }

        if matched.is_none() {
            warn!(target_name = %target, rows = count, "No element matched, writing default");
        }

        self.bindings.response.write(ctx, response)?;

        let record = TraceRecord::lookup(&target, response, matched);
        info!("{}", record.message);
        ctx.trace(record);

        Ok(ExitType::FirstExit)
    }
}
