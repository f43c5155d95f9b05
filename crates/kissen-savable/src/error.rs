use kissen_meta::MetaError;
use kissen_types::{DataError, EventCancelled};
use thiserror::Error;

use crate::list::ListExecution;

/// Error type for savable operations.
#[derive(Debug, Error)]
pub enum SavableError {
    /// A required key was absent when the savable was set up.
    #[error("Failed to initialize savable {id}: missing required keys {missing:?}")]
    Initialize { id: String, missing: Vec<String> },

    #[error("Key '{key}' is not set on {id}")]
    MissingKey { id: String, key: String },

    #[error("Index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A list action refused the mutation; the list was rolled back.
    #[error("List action rejected {execution:?}: {reason}")]
    Rejected {
        execution: ListExecution,
        reason: String,
    },

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Cancelled(#[from] EventCancelled),
}

/// Result type for savable operations.
pub type Result<T> = std::result::Result<T, SavableError>;
