//! Execution layer error types.

use thiserror::Error;

/// Errors that can occur while configuring the executor.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("runner not found: {0}")]
    RunnerNotFound(String),

    #[error("runner already registered: {0}")]
    DuplicateRunner(String),
}

pub type ExecResult<T> = Result<T, ExecError>;
