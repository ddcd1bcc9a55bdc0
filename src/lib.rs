//! Elementstep – an element lookup step for discrete-event simulation process models
//!
//! This crate implements a single process step and the minimal host it needs:
//! - A lookup step that resolves a target name from an expression, scans a
//!   repeat group of named scalar elements, and writes the first match (or 0.0)
//!   into a real state
//! - Typed, construction-time property bindings instead of a property bag
//! - Scoped row handles released on every exit path
//! - Property schemas with stable fingerprints, and a definition catalog
//! - JSON model and config persistence, plus a CLI for running visits

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Runtime core modules: the step, its collaborators, and the host
pub mod runtime;

// Re-export key types for convenience
pub use runtime::{Runtime, RuntimeConfig};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
