//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, Violations};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Business violations, when the failure is a rejected mutation.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            ApplicationError::Domain(e) => e.violations(),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
