//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{DomainError, Violations};
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        Self::Infra(e.into())
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Business violations behind a rejected mutation.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            CliError::Infra(InfraError::Application(e)) => e.violations(),
            _ => None,
        }
    }

    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Store { .. } => exitcode::DATAERR,
                InfraError::Application(e) => match e {
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => exitcode::SOFTWARE,
                    ApplicationError::Domain(e) => match e {
                        DomainError::Business(_) => exitcode::DATAERR,
                        DomainError::InvalidPath(_)
                        | DomainError::MalformedPath { .. }
                        | DomainError::InvalidStructure(_)
                        | DomainError::ProgramTreeAlreadyExists { .. } => exitcode::DATAERR,
                        DomainError::NodeNotFound { .. }
                        | DomainError::NodeIdentityNotFound { .. }
                        | DomainError::LinkNotFound { .. }
                        | DomainError::ProgramTreeNotFound { .. } => exitcode::NOINPUT,
                    },
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Violation;

    #[test]
    fn given_business_failure_when_mapping_then_dataerr_with_violations() {
        let err = CliError::from(ApplicationError::from(DomainError::from(
            Violation::CannotDetachRootNode {
                root: "LDROI100B".into(),
            },
        )));

        assert_eq!(err.exit_code(), exitcode::DATAERR);
        assert_eq!(err.violations().map(Violations::len), Some(1));
    }

    #[test]
    fn given_unknown_tree_when_mapping_then_noinput() {
        let err = CliError::from(ApplicationError::from(DomainError::ProgramTreeNotFound {
            code: "LDROI100B".into(),
            year: 2024,
        }));

        assert_eq!(err.exit_code(), exitcode::NOINPUT);
        assert!(err.violations().is_none());
    }

    #[test]
    fn given_config_failure_when_mapping_then_config_code() {
        let err = CliError::from(ApplicationError::Config {
            message: "bad".into(),
        });

        assert_eq!(err.exit_code(), exitcode::CONFIG);
    }
}
