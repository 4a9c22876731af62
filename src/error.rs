//! Error types for jobmarket.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Referenced job or proposal does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing required fields, bad pagination, malformed budget or timeline.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The entity's current status does not permit the requested operation.
    #[error("invalid state transition: cannot {operation} while {status}")]
    InvalidTransition { operation: String, status: String },

    /// Reserved for optimistic concurrent-edit detection. The store
    /// serializes writers, so nothing raises this today.
    #[error("conflicting mutation: {0}")]
    ConflictingMutation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`Error`], for collaborators that only
/// present the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InvalidTransition,
    ConflictingMutation,
    Internal,
}

impl Error {
    pub(crate) fn transition(operation: &str, status: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            operation: operation.to_string(),
            status: status.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Error::ConflictingMutation(_) => ErrorKind::ConflictingMutation,
            Error::Config(_) | Error::Io(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
