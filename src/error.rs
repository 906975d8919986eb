//! Errors surfaced by lifecycle operations.
//!
//! Every failure maps to a stable [`ErrorKind`] plus a human-readable
//! message. Messages never include storage keys or credentials.

use std::fmt;

use serde::Serialize;

use crate::render::RenderError;
use crate::repository::StoreError;
use crate::sequence::SequenceError;
use crate::storage::StorageError;

/// Stable error classification shared by the library, HTTP API and CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Conflict,
    NotFound,
    InvalidStateTransition,
    BackendUnavailable,
    RenderFailed,
    MissingConfiguration,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::InvalidStateTransition => "invalid_state_transition",
            Self::BackendUnavailable => "backend_unavailable",
            Self::RenderFailed => "render_failed",
            Self::MissingConfiguration => "missing_configuration",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`crate::DocumentLifecycle`] operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidStateTransition(_) => ErrorKind::InvalidStateTransition,
            Self::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Self::RenderFailed(_) => ErrorKind::RenderFailed,
            Self::MissingConfiguration(_) => ErrorKind::MissingConfiguration,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to end users.
    ///
    /// Backend and database details stay in the logs; only validation,
    /// conflict and state messages are passed through.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidInput(msg)
            | Self::Conflict(msg)
            | Self::NotFound(msg)
            | Self::InvalidStateTransition(msg)
            | Self::MissingConfiguration(msg) => msg.clone(),
            Self::BackendUnavailable(_) => "The storage service is unavailable".to_string(),
            Self::RenderFailed(_) => "The document could not be rendered".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<StorageError> for LifecycleError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidInput(msg) => LifecycleError::InvalidInput(msg),
            StorageError::NotFound => LifecycleError::NotFound("stored file not found".to_string()),
            StorageError::Unavailable(msg) => LifecycleError::BackendUnavailable(msg),
            StorageError::MalformedReference(msg) => LifecycleError::Internal(msg),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateSerialNumber(serial) => LifecycleError::Conflict(format!(
                "a document with serial number '{}' already exists",
                serial
            )),
            StoreError::NotFound => LifecycleError::NotFound("document not found".to_string()),
            e @ StoreError::InvalidStateTransition { .. } => {
                LifecycleError::InvalidStateTransition(e.to_string())
            }
            StoreError::Corrupt(msg) => LifecycleError::Internal(msg),
            StoreError::Database(e) => LifecycleError::Internal(e.to_string()),
        }
    }
}

impl From<SequenceError> for LifecycleError {
    fn from(e: SequenceError) -> Self {
        match e {
            SequenceError::InvalidKey(msg) => LifecycleError::InvalidInput(msg),
            other => LifecycleError::Internal(other.to_string()),
        }
    }
}

impl From<RenderError> for LifecycleError {
    fn from(e: RenderError) -> Self {
        LifecycleError::RenderFailed(e.to_string())
    }
}

impl From<diesel::result::Error> for LifecycleError {
    fn from(e: diesel::result::Error) -> Self {
        LifecycleError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentStatus;

    #[test]
    fn test_store_errors_map_to_kinds() {
        let conflict: LifecycleError = StoreError::DuplicateSerialNumber("001".into()).into();
        assert_eq!(conflict.kind(), ErrorKind::Conflict);

        let transition: LifecycleError = StoreError::InvalidStateTransition {
            from: Some(DocumentStatus::Approved),
            to: DocumentStatus::Rejected,
        }
        .into();
        assert_eq!(transition.kind(), ErrorKind::InvalidStateTransition);
        assert!(transition.public_message().contains("approved"));
    }

    #[test]
    fn test_backend_details_are_not_public() {
        let err: LifecycleError =
            StorageError::Unavailable("PUT letters/1700000000000-secret.pdf failed".into()).into();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert!(!err.public_message().contains("letters/"));

        let err: LifecycleError = StoreError::Corrupt("bad row".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.public_message().contains("bad row"));
    }

    #[test]
    fn test_kind_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidStateTransition.as_str(), "invalid_state_transition");
        assert_eq!(
            serde_json::to_string(&ErrorKind::MissingConfiguration).unwrap(),
            "\"missing_configuration\""
        );
    }
}
