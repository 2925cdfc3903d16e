//! Error taxonomy for the conversation engine
//!
//! Every error here is recoverable at single-interaction granularity: the
//! engine maps them onto response outcomes (re-prompt, start over, retry
//! save) rather than letting them escape to the caller as failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed field input. The flow re-issues the same prompt; no state
/// changes.
///
/// These ride inside [`crate::engine::EngineResponse`], so they serialize
/// like every other response payload.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("input does not contain a positive amount: '{input}'")]
    InvalidAmount { input: String },

    #[error("input is empty")]
    EmptyInput,

    #[error("name exceeds {max} characters")]
    NameTooLong { max: usize },

    #[error("classification '{name}' already exists")]
    DuplicateName { name: String },

    #[error("nothing to save yet: the flow is still collecting fields")]
    NotReadyToSave,
}

/// Collaborator save failure. The session and registry entry are preserved
/// so the user can retry without re-entering data.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("persistence failed: {message}")]
pub struct PersistenceError {
    pub message: String,
    /// Whether a retry of the same save can reasonably succeed.
    pub retryable: bool,
}

impl PersistenceError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Top-level flow error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    /// An action arrived with no matching registry entry. The caller must
    /// treat this as "the flow already ended" and re-prompt, never crash.
    #[error("no active flow for this user")]
    NoActiveFlow,

    /// Lazily detected on access. Behaves like `NoActiveFlow` for the user
    /// but is logged distinctly for observability.
    #[error("edit session expired")]
    SessionExpired,

    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result alias for flow-level operations.
pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_wraps_into_flow_error() {
        let err: FlowError = ValidationError::EmptyInput.into();
        assert!(matches!(err, FlowError::Validation(_)));
    }

    #[test]
    fn test_persistence_error_retryability() {
        let err = PersistenceError::retryable("sheet unavailable");
        assert!(err.retryable);
        let err = PersistenceError::permanent("record rejected");
        assert!(!err.retryable);
    }

    #[test]
    fn test_error_display() {
        let err = FlowError::from(ValidationError::InvalidAmount {
            input: "abc".to_string(),
        });
        assert!(err.to_string().contains("abc"));
    }
}
