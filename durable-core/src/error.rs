//! Error types for the execution engine.

use crate::store::StoreError;

/// Fatal errors observable at the run-engine boundary.
///
/// Handler failures are not represented here: the run engine absorbs them
/// into `failed`/`aborted` store state instead of returning an error.
#[derive(Debug)]
pub enum WorkflowError {
    /// A claimed workflow id was not found on re-read.
    /// Indicates store corruption.
    WorkflowNotFound(String),
    /// The workflow's handler name is not registered.
    /// Indicates worker misconfiguration.
    HandlerNotFound(String),
    /// A persistence call failed.
    Store(StoreError),
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowError::WorkflowNotFound(id) => {
                write!(f, "workflow '{}' not found", id)
            }
            WorkflowError::HandlerNotFound(name) => {
                write!(f, "handler '{}' not registered", name)
            }
            WorkflowError::Store(err) => write!(f, "store error: {}", err),
        }
    }
}

impl std::error::Error for WorkflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkflowError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        WorkflowError::Store(err)
    }
}
