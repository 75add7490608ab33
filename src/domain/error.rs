//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::message::{Violation, Violations};

/// Domain errors come in two families.
///
/// Lookup failures (unknown node, unknown path, unknown tree) are fatal to the
/// current operation. Business failures are collected by the validator
/// pipeline and surface as one aggregate [`Violations`] value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("node not found on the current tree: {path}")]
    NodeNotFound { path: String },

    #[error("node {code} ({year}) not found on the current tree")]
    NodeIdentityNotFound { code: String, year: i32 },

    #[error("link not found on the current tree: {path}")]
    LinkNotFound { path: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A path revisiting one of its own nodes: the structure it was built from is cyclic.
    #[error("malformed path, node repeated: {path}")]
    MalformedPath { path: String },

    #[error("program tree not found: {code} ({year})")]
    ProgramTreeNotFound { code: String, year: i32 },

    #[error("program tree already exists: {code} ({year})")]
    ProgramTreeAlreadyExists { code: String, year: i32 },

    #[error("invalid tree structure: {0}")]
    InvalidStructure(String),

    #[error("{0}")]
    Business(#[from] Violations),
}

impl From<Violation> for DomainError {
    fn from(violation: Violation) -> Self {
        DomainError::Business(violation.into())
    }
}

impl DomainError {
    /// Business violations carried by this error, if it is a business failure.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            DomainError::Business(violations) => Some(violations),
            _ => None,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
