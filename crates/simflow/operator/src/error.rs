//! Error types for simflow-operator
//!
//! Domain failures (a block that cannot be created or reports `Failed`) are
//! never errors here: they are recorded in the Simulation's status. The types
//! below cover configuration and infrastructure failures only.

use std::time::Duration;
use thiserror::Error;

/// Operator-level errors, fatal at startup
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Kubernetes client construction or API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Health server error
    #[error("Server error: {0}")]
    Server(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for OperatorError {
    fn from(err: config::ConfigError) -> Self {
        OperatorError::Config(err.to_string())
    }
}

/// Resource store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The object no longer exists
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store unreachable or rejected the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// The object could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub(crate) fn from_kube(err: kube::Error, subject: &str) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 409 => {
                StoreError::Conflict(format!("{}: {}", subject, response.message))
            }
            kube::Error::Api(response) if response.code == 404 => {
                StoreError::NotFound(subject.to_string())
            }
            kube::Error::SerdeError(e) => StoreError::Serialization(e.to_string()),
            other => StoreError::Transport(other.to_string()),
        }
    }
}

/// Workload orchestration API errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkloadError {
    /// A unit with this name already exists
    #[error("unit {0} already exists")]
    AlreadyExists(String),

    /// The unit does not exist
    #[error("unit {0} not found")]
    NotFound(String),

    /// A unit with this name exists but belongs to something else
    #[error("unit {name} exists and is not owned by simulation {simulation}")]
    Conflict { name: String, simulation: String },

    /// The platform rejected the request
    #[error("request rejected ({code}): {message}")]
    Rejected { code: u16, message: String },

    /// The platform could not be reached
    #[error("transport error: {0}")]
    Transport(String),
}

impl WorkloadError {
    /// Errors that may succeed if the same request is repeated later
    pub fn is_transient(&self) -> bool {
        match self {
            WorkloadError::Transport(_) => true,
            WorkloadError::Rejected { code, .. } => *code == 429 || *code >= 500,
            WorkloadError::AlreadyExists(_)
            | WorkloadError::NotFound(_)
            | WorkloadError::Conflict { .. } => false,
        }
    }

    pub(crate) fn from_kube(err: kube::Error, name: &str) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                404 => WorkloadError::NotFound(name.to_string()),
                409 => WorkloadError::AlreadyExists(name.to_string()),
                code => WorkloadError::Rejected {
                    code,
                    message: response.message,
                },
            },
            other => WorkloadError::Transport(other.to_string()),
        }
    }
}

/// Errors raised by an execution driver
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Execution driver error: {0}")]
    Driver(String),
}

/// Reasons a reconciliation pass was aborted
///
/// Every variant is retryable by the scheduler; none of them mutates status.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Reconciliation pass exceeded its deadline of {0:?}")]
    Timeout(Duration),
}

impl ReconcileError {
    /// Optimistic concurrency conflict: retry from a fresh fetch
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Store(StoreError::Conflict(_)))
    }
}

/// Result type alias for operator operations
pub type OperatorResult<T> = Result<T, OperatorError>;
