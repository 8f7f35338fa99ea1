// src/error.rs

use std::io;
use thiserror::Error;

/// Errors raised while reading namelist text or coercing values to the schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("no namelist group found")]
    NoGroup,

    #[error("group '&{0}' is not terminated by '/' or '&end'")]
    UnterminatedGroup(String),

    #[error("invalid index for '{key}': {message}")]
    InvalidIndex { key: String, message: String },

    #[error("array '{key}' has unassigned element(s)")]
    IncompleteArray { key: String },

    #[error("matrix '{key}' has rows of different lengths")]
    RaggedMatrix { key: String },

    #[error("'{key}' has no value")]
    EmptyValue { key: String },

    #[error("unsupported value for '{key}': {message}")]
    UnsupportedValue { key: String, message: String },

    #[error("type mismatch for '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("'{key}' must have {expected} element(s), found {found}")]
    InvalidLength {
        key: String,
        expected: usize,
        found: usize,
    },
}

/// Top-level error for Control operations.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field(s): {}", .0.join(", "))]
    MissingField(Vec<String>),

    #[error("type index {index} has no matching entry in 'elements' ({count} defined)")]
    UnknownType { index: i64, count: usize },

    #[error("lattice vectors are linearly dependent")]
    SingularLattice,
}
