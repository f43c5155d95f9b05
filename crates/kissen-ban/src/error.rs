use kissen_meta::MetaError;
use kissen_savable::SavableError;
use kissen_types::{DataError, EventCancelled};
use thiserror::Error;

/// Error type for ban operations.
#[derive(Debug, Error)]
pub enum BanError {
    #[error("Ban {0} does not exist")]
    UnknownBan(i32),

    #[error("Unknown ban type '{0}'")]
    UnknownBanType(String),

    /// A stored ban value could not be parsed.
    #[error("Ban {id} has an invalid '{key}': {value}")]
    InvalidValue { id: i32, key: String, value: String },

    /// A listener replaced the event with one of a different kind.
    #[error("Listener replaced event '{0}' with a different kind")]
    EventRewritten(&'static str),

    #[error(transparent)]
    Savable(#[from] SavableError),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Cancelled(#[from] EventCancelled),
}

/// Result type for ban operations.
pub type Result<T> = std::result::Result<T, BanError>;
