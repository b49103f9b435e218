// Error types for the schemaforge core

use crate::property::{PropertyId, PropertyType};
use thiserror::Error;

/// A validation failure attached to a single field of a property.
///
/// These never abort anything: they are collected into per-property
/// error maps and displayed inline while editing continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("key must not be empty")]
    EmptyKey,

    #[error(
        "key '{0}' must start with a letter, '_' or '$' and contain only \
         letters, digits, '_' or '$'"
    )]
    InvalidKeyFormat(String),

    #[error("another property at this level is already named '{0}'")]
    DuplicateKey(String),

    #[error("invalid property type: {0}")]
    InvalidType(String),

    #[error("value does not match declared type '{expected}'")]
    ValueMismatch { expected: PropertyType },

    #[error("maximum nesting depth of {max} exceeded")]
    MaxDepthExceeded { max: usize },
}

/// A structural guard failure: the requested tree mutation was refused
/// and nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("property {0} does not exist")]
    UnknownProperty(PropertyId),

    #[error("parent property {0} does not exist")]
    UnknownParent(PropertyId),

    #[error("nesting under {0} would exceed the maximum depth")]
    DepthLimit(PropertyId),

    #[error("attaching under {0} would create a cycle")]
    Cycle(PropertyId),
}

/// Failures converting to or from the JSON Schema document. A
/// non-object root is not an error: it parses fine and flattens to an
/// empty property collection.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to serialize schema: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for tree mutations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Result type for schema document operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
