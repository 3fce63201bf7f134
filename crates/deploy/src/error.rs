//! Error taxonomy for registration and deployment.

use alloy_core::primitives::Address;

/// Errors raised by the registry and the orchestrator.
///
/// Every variant is fatal to the operation that produced it. An artifact that is
/// already deployed is not an error: it is reported as `Found`.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// An artifact with the same name is already registered.
    #[error("artifact `{name}` is already registered")]
    DuplicateName { name: String },

    /// No artifact is registered under this name.
    #[error("artifact `{name}` is not registered")]
    NotFound { name: String },

    /// The deployment oracle failed to answer or to deploy.
    #[error("deployment oracle failed while {operation}")]
    OracleFault {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// The oracle deployed to a different address than the one it computed.
    #[error("oracle deployed `{name}` at {actual}, expected {expected}")]
    AddressMismatch {
        name: String,
        expected: Address,
        actual: Address,
    },

    /// The report could not be written.
    #[error("failed to write deployment report")]
    Report(#[from] std::io::Error),

    /// A harness check failed.
    #[error("assertion failed: {message}")]
    AssertionFailure { message: String },
}

impl DeployError {
    pub(crate) fn oracle(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::OracleFault {
            operation: operation.into(),
            source,
        }
    }

    /// Whether this error originates from the deployment oracle.
    pub fn is_oracle_fault(&self) -> bool {
        matches!(self, Self::OracleFault { .. } | Self::AddressMismatch { .. })
    }
}

pub type Result<T, E = DeployError> = std::result::Result<T, E>;
