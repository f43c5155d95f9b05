//! JSON data codec and short id generation.
//!
//! Every structured value Kissen persists (permission nodes, punishment
//! snapshots, string lists) goes through [`to_json`] / [`from_json`] so the
//! storage layer only ever sees text.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

/// Error produced by the JSON data codec.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to encode {type_name} as JSON: {source}")]
    Encode {
        type_name: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to decode {type_name} from JSON: {source}")]
    Decode {
        type_name: &'static str,
        source: serde_json::Error,
    },
}

/// Serializes a record to its JSON text form.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, DataError> {
    serde_json::to_string(value).map_err(|source| DataError::Encode {
        type_name: std::any::type_name::<T>(),
        source,
    })
}

/// Parses a record from its JSON text form.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, DataError> {
    serde_json::from_str(json).map_err(|source| DataError::Decode {
        type_name: std::any::type_name::<T>(),
        source,
    })
}

/// Generates a short, human-typable id (four lowercase hex characters).
///
/// Taken from the second group of a random UUID v4. Collisions are possible
/// and callers scope these ids to a single owner.
pub fn generate_id() -> String {
    let uuid = Uuid::new_v4().to_string();
    uuid.split('-').nth(1).unwrap_or(&uuid[..4]).to_string()
}
