//! Execution context for one token visit
//!
//! Borrows the model for the duration of a step call, collects the trace
//! records the step emits, and counts row-handle acquisitions.

use std::cell::Cell;

use super::model::Model;
use super::step::StepContext;
use super::trace::TraceRecord;

/// Counts row handles acquired and released during one visit
#[derive(Debug, Default)]
pub struct RowLedger {
    acquired: Cell<usize>,
    released: Cell<usize>,
}

impl RowLedger {
    /// Note a handle acquisition
    pub fn acquire(&self) {
        self.acquired.set(self.acquired.get() + 1);
    }

    /// Note a handle release
    pub fn release(&self) {
        self.released.set(self.released.get() + 1);
    }

    /// Handles acquired so far
    pub fn acquired(&self) -> usize {
        self.acquired.get()
    }

    /// Handles released so far
    pub fn released(&self) -> usize {
        self.released.get()
    }

    /// Handles currently outstanding
    pub fn outstanding(&self) -> usize {
        self.acquired() - self.released()
    }
}

/// Host context handed to a step for one visit
pub struct ExecutionContext<'m> {
    model: &'m mut Model,
    ledger: RowLedger,
    records: Vec<TraceRecord>,
}

impl<'m> ExecutionContext<'m> {
    /// Create a context borrowing `model`
    pub fn new(model: &'m mut Model) -> Self {
        Self {
            model,
            ledger: RowLedger::default(),
            records: Vec::new(),
        }
    }

    /// Model being executed
    pub fn model(&self) -> &Model {
        &*self.model
    }

    /// Mutable access to the model
    pub fn model_mut(&mut self) -> &mut Model {
        &mut *self.model
    }

    /// Row-handle ledger
    pub fn ledger(&self) -> &RowLedger {
        &self.ledger
    }

    /// Consume the context, returning its ledger and trace records
    pub fn finish(self) -> (RowLedger, Vec<TraceRecord>) {
        (self.ledger, self.records)
    }
}

impl StepContext for ExecutionContext<'_> {
    fn trace(&mut self, record: TraceRecord) {
        self.records.push(record);
    }
}
