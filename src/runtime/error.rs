//! Error types for the element step runtime
//!
//! Domain errors use thiserror; the filesystem and CLI boundary converts them
//! into anyhow where convenient.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level runtime error
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Schema and definition errors
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Property binding errors raised while constructing a step
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// Errors raised by a collaborator during step execution
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// No placed step with this name
    #[error("Step '{0}' not found in model")]
    UnknownStep(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Property schema and definition catalog errors
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Property declared twice in one schema
    #[error("Property '{0}' is already defined")]
    DuplicateProperty(String),

    /// Definition name or unique id registered twice
    #[error("Definition '{0}' is already registered")]
    DuplicateDefinition(String),

    /// Definition not present in the catalog
    #[error("Unknown definition '{0}'")]
    UnknownDefinition(String),

    /// Model was saved against a different schema
    #[error("Fingerprint mismatch for '{definition}': expected {expected}, found {found}")]
    FingerprintMismatch {
        /// Definition name
        definition: String,
        /// Fingerprint of the registered schema
        expected: String,
        /// Fingerprint recorded in the model
        found: String,
    },
}

/// Convenience result alias for schema operations
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Errors detected while resolving a step's property bindings
#[derive(Debug, Error)]
pub enum BindingError {
    /// Required property has no value
    #[error("Required property '{0}' is not set")]
    MissingProperty(String),

    /// Repeat group not present in the model
    #[error("Repeat group '{0}' not found")]
    UnknownGroup(String),

    /// Row references an element instance that does not exist
    #[error("Row {row} of '{group}' references unknown element '{element}'")]
    UnknownElement {
        /// Repeat group name
        group: String,
        /// Row index
        row: usize,
        /// Referenced element id
        element: String,
    },

    /// Row references an element of the wrong definition
    #[error("Element '{element}' is not a {expected}")]
    WrongElementType {
        /// Referenced element id
        element: String,
        /// Expected definition name
        expected: String,
    },

    /// State not present in the model
    #[error("State '{0}' not found")]
    UnknownState(String),

    /// State exists but cannot hold a real value
    #[error("State '{0}' is not a real state")]
    NotRealState(String),

    /// Target-name expression failed to parse
    #[error("Invalid expression: {0}")]
    Expression(#[from] ExpressionError),
}

/// Convenience result alias for binding resolution
pub type BindingResult<T> = std::result::Result<T, BindingError>;

/// Expression parsing and evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Expression text is empty
    #[error("Expression is empty")]
    Empty,

    /// Syntax error
    #[error("Parse error at {position}: {detail}")]
    Parse {
        /// Byte offset of the error
        position: usize,
        /// Description of the error
        detail: String,
    },

    /// Identifier does not name a state
    #[error("Unknown state '{0}' in expression")]
    UnknownState(String),
}

/// Convenience result alias for expression operations
pub type ExpressionResult<T> = std::result::Result<T, ExpressionError>;

/// Collaborator failures surfaced while a step executes
#[derive(Debug, Error)]
pub enum StepError {
    /// Row index beyond the current row count
    #[error("Row {index} out of range (count {count})")]
    RowOutOfRange {
        /// Requested row
        index: usize,
        /// Current row count
        count: usize,
    },

    /// Repeat group removed after construction
    #[error("Repeat group '{0}' not found")]
    UnknownGroup(String),

    /// Element removed after construction
    #[error("Element '{0}' not found")]
    UnknownElement(String),

    /// Element replaced by one of another definition
    #[error("Element '{element}' is not a {expected}")]
    WrongElementType {
        /// Element id
        element: String,
        /// Expected definition name
        expected: String,
    },

    /// State removed after construction
    #[error("State '{0}' not found")]
    UnknownState(String),

    /// State changed to a non-real kind after construction
    #[error("State '{0}' is not a real state")]
    NotRealState(String),

    /// Target-name expression failed to evaluate
    #[error("Expression evaluation failed: {0}")]
    Expression(#[from] ExpressionError),
}

/// Convenience result alias for step execution
pub type StepResult<T> = std::result::Result<T, StepError>;

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Atomic write failed
    #[error("Atomic write failed for {path}: {detail}")]
    AtomicWriteFailed {
        /// Path where write failed
        path: PathBuf,
        /// Error details
        detail: String,
    },

    /// Two elements in a stored model share an id
    #[error("Element '{0}' is defined more than once")]
    DuplicateElement(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type using RuntimeError
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_wraps_expression_error() {
        let err: StepError = ExpressionError::UnknownState("Missing".into()).into();
        assert_eq!(
            err.to_string(),
            "Expression evaluation failed: Unknown state 'Missing' in expression"
        );
    }

    #[test]
    fn test_runtime_error_from_binding() {
        let err: RuntimeError = BindingError::NotRealState("Label".into()).into();
        assert!(matches!(err, RuntimeError::Binding(BindingError::NotRealState(_))));
        assert_eq!(err.to_string(), "Binding error: State 'Label' is not a real state");
    }
}
