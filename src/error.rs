//! Error types for the FlatZinc pipeline.

use thiserror::Error;

pub type FznResult<T> = std::result::Result<T, FznError>;

/// Errors surfaced by tokenizing, parsing, lowering, presolving, and
/// extraction. Lex and parse errors carry the source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FznError {
    #[error("lex error at line {line}, column {column}: {message}")]
    LexError {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Identifier not found, or an array index out of range.
    #[error("reference error: {message}")]
    RefError { message: String },

    /// The model violates a structural invariant, e.g. two constraints
    /// claiming to define the same variable, or a dependency cycle.
    #[error("inconsistent model: {message}")]
    InconsistentModel { message: String },

    /// The back-end refused a constraint signature.
    #[error("back-end rejected constraint: {message}")]
    BackendError { message: String },

    /// Input uses a feature outside the integer FlatZinc subset.
    #[error("unsupported: {message}")]
    Unsupported { message: String },

    #[error("io error: {0}")]
    IoError(String),
}

impl FznError {
    pub fn reference(message: impl Into<String>) -> Self {
        FznError::RefError {
            message: message.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        FznError::InconsistentModel {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        FznError::BackendError {
            message: message.into(),
        }
    }
}
