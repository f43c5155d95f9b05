//! Meta error types

use kissen_types::DataError;
use thiserror::Error;

use crate::codec::ValueKind;

/// Failure inside a storage backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Failed to connect to {location}: {source}")]
    Connect {
        location: String,
        source: duckdb::Error,
    },

    #[error("Unsupported query on table {table}: {reason}")]
    Unsupported { table: String, reason: String },
}

/// Failure converting between stored text and a typed value.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Cannot decode {raw:?} as {kind}")]
    Invalid { kind: ValueKind, raw: String },

    #[error("Unknown value kind '{0}'")]
    UnknownKind(String),
}

/// Error type for meta operations.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Data(#[from] DataError),

    /// Scalar keys must not start with the list prefix.
    #[error("Key '{0}' is reserved for lists")]
    ReservedKey(String),
}

/// Result type for meta operations.
pub type Result<T> = std::result::Result<T, MetaError>;
