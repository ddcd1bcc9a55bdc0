//! Runtime orchestrator and public API
//!
//! This module provides the main `Runtime` struct that owns the process
//! model, instantiates its placed steps, and executes token visits.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug_span, warn};

// Submodules
pub mod context;
pub mod element;
pub mod error;
pub mod expression;
pub mod model;
pub mod property;
pub mod registry;
pub mod schema;
pub mod state;
pub mod step;
pub mod storage;
pub mod trace;

pub use error::{Result, RuntimeError};

use context::ExecutionContext;
use model::{Model, StepInstance};
use registry::{DefinitionCatalog, DefinitionRegistry, HostStep};
use step::ExitType;
use trace::{TraceEntry, TraceLog, TraceRecord};

/// Configuration for the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Root directory for config and model files (default: .elementstep/)
    pub root: PathBuf,

    /// Retain step trace records in the trace log
    pub trace: bool,

    /// Maximum number of trace records retained
    pub trace_capacity: usize,

    /// Reject models whose recorded schema fingerprints are stale
    pub validate_fingerprints: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".elementstep"),
            trace: true,
            trace_capacity: 1024,
            validate_fingerprints: true,
        }
    }
}

/// Result of one token visit
#[derive(Debug, Clone)]
pub struct VisitOutcome {
    /// Visit counter
    pub visit: u64,
    /// Exit the token leaves by
    pub exit: ExitType,
    /// Trace records emitted during the visit
    pub records: Vec<TraceRecord>,
    /// Row handles acquired
    pub rows_acquired: usize,
    /// Row handles released
    pub rows_released: usize,
}

/// The main runtime orchestrator
pub struct Runtime {
    config: RuntimeConfig,
    registry: DefinitionRegistry,
    model: Model,
    steps: HashMap<String, Box<HostStep>>,
    trace: TraceLog,
    visits: u64,
}

impl Runtime {
    /// Create a runtime over `model`, instantiating every placed step
    ///
    /// Fails if a step's definition is unknown, its bindings do not resolve,
    /// or (when enabled) the model's fingerprints are stale.
    pub fn new(config: RuntimeConfig, mut model: Model) -> Result<Self> {
        let registry = DefinitionCatalog::global().snapshot();
        if config.validate_fingerprints {
            registry.validate_fingerprints(&model)?;
        }

        let mut runtime = Self {
            trace: TraceLog::new(config.trace_capacity),
            config,
            registry,
            model: Model::new(),
            steps: HashMap::new(),
            visits: 0,
        };

        let placed = std::mem::take(&mut model.steps);
        runtime.model = model;
        for instance in placed {
            runtime.place_step(instance)?;
        }

        Ok(runtime)
    }

    /// Write a config and model to the config's root directory
    pub fn init(config: &RuntimeConfig, model: &Model) -> anyhow::Result<()> {
        storage::init_storage(&config.root)?;
        storage::write_config(config)?;

        let registry = DefinitionCatalog::global().snapshot();
        let mut model = model.clone();
        for name in registry.step_names().into_iter().chain(registry.element_names()) {
            model
                .fingerprints
                .insert(name.to_string(), registry.fingerprint(name)?);
        }
        storage::write_model(&config.root, &model)?;
        Ok(())
    }

    /// Load a runtime from a directory written by [`Runtime::init`]
    pub fn load(root: PathBuf) -> anyhow::Result<Self> {
        let mut config = storage::load_config(&root)?;
        config.root = root;
        let model = storage::load_model(&config.root)?;
        Ok(Self::new(config, model)?)
    }

    /// Instantiate and add a step to the model
    pub fn place_step(&mut self, instance: StepInstance) -> Result<()> {
        if self.steps.contains_key(&instance.name) {
            return Err(RuntimeError::Config(format!(
                "Step '{}' is placed twice",
                instance.name
            )));
        }
        let definition = self.registry.step(&instance.definition)?;
        let step = definition.create_step(&instance.properties, &self.model)?;
        self.steps.insert(instance.name.clone(), step);
        self.model.steps.push(instance);
        Ok(())
    }

    /// Execute one token visit of the named step
    pub fn visit(&mut self, step_name: &str) -> Result<VisitOutcome> {
        let step = self
            .steps
            .get(step_name)
            .ok_or_else(|| RuntimeError::UnknownStep(step_name.to_string()))?;

        let visit = self.visits + 1;
        let _span = debug_span!("visit", step = step_name, visit).entered();

        let mut ctx = ExecutionContext::new(&mut self.model);
        let result = step.execute(&mut ctx);
        let (ledger, records) = ctx.finish();
        let exit = result.inspect_err(|e| {
            warn!(
                error = %e,
                acquired = ledger.acquired(),
                released = ledger.released(),
                "visit failed"
            )
        })?;
        self.visits = visit;

        if self.config.trace {
            for record in &records {
                self.trace.push(TraceEntry {
                    visit,
                    step: step_name.to_string(),
                    record: record.clone(),
                });
            }
        }

        Ok(VisitOutcome {
            visit,
            exit,
            records,
            rows_acquired: ledger.acquired(),
            rows_released: ledger.released(),
        })
    }

    /// Execute `visits` consecutive token visits of the named step
    pub fn run(&mut self, step_name: &str, visits: usize) -> Result<Vec<VisitOutcome>> {
        (0..visits).map(|_| self.visit(step_name)).collect()
    }

    /// Get the current configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Definitions this runtime was created with
    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Process model
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Mutable process model, for edits between visits
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// Retained trace records
    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    /// Number of visits executed so far
    pub fn visits(&self) -> u64 {
        self.visits
    }
}
