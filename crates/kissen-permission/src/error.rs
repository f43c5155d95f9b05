use kissen_meta::MetaError;
use kissen_savable::SavableError;
use kissen_types::EventCancelled;
use thiserror::Error;

/// Error type for permission operations.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("Unknown permission entry '{0}'")]
    UnknownEntry(String),

    #[error("Permission entry '{0}' is not a group")]
    NotAGroup(String),

    #[error("Permission group '{0}' already exists")]
    GroupExists(String),

    #[error("Entry '{entry}' has no permission '{permission}'")]
    UnknownPermission { entry: String, permission: String },

    /// A node was handed to an entry that does not own it.
    #[error("Permission owner '{owner}' does not match entry '{entry}'")]
    OwnerMismatch { owner: String, entry: String },

    /// Adding the member would make the group graph cyclic.
    #[error("Cannot add '{member}' to group '{group}': it would create a membership cycle")]
    GroupConflict { group: String, member: String },

    /// A listener replaced the event with one of a different kind.
    #[error("Listener replaced event '{0}' with a different kind")]
    EventRewritten(&'static str),

    #[error(transparent)]
    Savable(#[from] SavableError),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Cancelled(#[from] EventCancelled),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermissionError>;
