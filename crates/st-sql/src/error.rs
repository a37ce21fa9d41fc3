//! Error types for st-sql

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the lineage engine.
///
/// Only input problems are errors; everything that goes wrong after a
/// successful parse degrades the result instead of failing the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineageError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Unknown dialect name (S003)
    #[error("[S003] Unknown SQL dialect: {0}")]
    UnknownDialect(String),
}

impl LineageError {
    /// Error class exposed to callers: `ParseError` or `ValueError`.
    pub fn error_type(&self) -> &'static str {
        match self {
            LineageError::ParseError { .. } => "ParseError",
            LineageError::EmptySql | LineageError::UnknownDialect(_) => "ValueError",
        }
    }

    /// Caller-facing message; parse errors carry the parser's own text.
    pub fn message(&self) -> String {
        match self {
            LineageError::ParseError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Serializable `{type, message}` payload.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            error_type: self.error_type().to_string(),
            message: self.message(),
        }
    }
}

/// Wire form of a [`LineageError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// `ParseError` or `ValueError`
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable description
    pub message: String,
}

/// Result type alias for LineageError
pub type SqlResult<T> = Result<T, LineageError>;

/// Failure of the column qualification pass. Never surfaced to callers:
/// the engine falls back to the unqualified tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualifyError {
    /// A relation in scope is not a usable table identifier (S004)
    #[error("[S004] Cannot qualify columns against relation '{name}': {reason}")]
    InvalidRelation { name: String, reason: String },
}
